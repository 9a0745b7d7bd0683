//! Core vault types for Paracord: plain-text task, project and area records
//! with a relationship index and a fidelity-preserving writer.

pub mod check;
pub mod config;
pub mod dates;
pub mod frontmatter;
pub mod index;
pub mod query;
pub mod record;
pub mod reference;
pub mod scan;
pub mod update;
pub mod vault;

#[cfg(test)]
pub(crate) mod test_env;

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::version;

    #[test]
    fn version_is_not_empty() {
        assert!(!version().is_empty());
    }
}
