pub const FULL: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "+git.",
    env!("PARACORD_GIT_COUNT"),
    ".",
    env!("PARACORD_GIT_SHA"),
    env!("PARACORD_GIT_DIRTY")
);
