use rand::seq::SliceRandom;

use crate::error::{FetchError, Result};

/// The gateway pool: several interchangeable primaries and one fixed fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gateways {
    primaries: Vec<String>,
    fallback: String,
}

impl Gateways {
    pub fn new(primaries: Vec<String>, fallback: impl Into<String>) -> Result<Self> {
        if primaries.is_empty() {
            return Err(FetchError::NoGateways);
        }
        Ok(Self {
            primaries: primaries.into_iter().map(trim_base).collect(),
            fallback: trim_base(fallback.into()),
        })
    }

    pub fn primaries(&self) -> &[String] {
        &self.primaries
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// Pick one primary uniformly at random.
    pub fn random_primary(&self) -> &str {
        self.primaries
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
            .unwrap_or(&self.fallback)
    }
}

fn trim_base(base: String) -> String {
    base.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_primaries_rejected() {
        let err = Gateways::new(vec![], "http://fallback:8080").unwrap_err();
        assert!(matches!(err, FetchError::NoGateways));
    }

    #[test]
    fn trailing_slash_trimmed() {
        let gateways = Gateways::new(vec!["https://ipfs.io/".into()], "http://backend-ipfs:8080/").unwrap();
        assert_eq!(gateways.primaries(), ["https://ipfs.io"]);
        assert_eq!(gateways.fallback(), "http://backend-ipfs:8080");
    }

    #[test]
    fn random_primary_is_from_pool() {
        let pool = vec!["https://a.example".to_string(), "https://b.example".to_string()];
        let gateways = Gateways::new(pool.clone(), "http://fallback").unwrap();
        for _ in 0..32 {
            let picked = gateways.random_primary();
            assert!(pool.iter().any(|g| g == picked));
        }
    }
}
