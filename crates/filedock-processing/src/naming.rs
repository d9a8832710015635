//! Stored-name generation.
//!
//! Stored names are built only from server-generated parts plus a sanitized
//! extension; the original filename never contributes a path component.

use chrono::Utc;
use filedock_core::NamingStrategy;
use rand::Rng;
use uuid::Uuid;

const TOKEN_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const TOKEN_LEN: usize = 6;
const MAX_EXTENSION_LEN: usize = 16;

#[derive(Debug, Clone, Copy)]
pub struct NameGenerator {
    strategy: NamingStrategy,
}

impl NameGenerator {
    pub fn new(strategy: NamingStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> NamingStrategy {
        self.strategy
    }

    pub fn generate(&self, original_name: &str) -> String {
        let stem = match self.strategy {
            NamingStrategy::Uuid => Uuid::new_v4().to_string(),
            NamingStrategy::Timestamp => {
                format!("{}_{}", Utc::now().timestamp_millis(), random_token())
            }
        };

        match extension_of(original_name) {
            Some(ext) => format!("{}.{}", stem, ext),
            None => stem,
        }
    }
}

impl Default for NameGenerator {
    fn default() -> Self {
        Self::new(NamingStrategy::Uuid)
    }
}

fn random_token() -> String {
    let mut rng = rand::rng();
    (0..TOKEN_LEN)
        .map(|_| TOKEN_ALPHABET[rng.random_range(0..TOKEN_ALPHABET.len())] as char)
        .collect()
}

/// The portion of the filename after its final `.`, restricted to ASCII
/// alphanumerics. `None` when there is no usable extension.
pub fn extension_of(original_name: &str) -> Option<String> {
    let base = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original_name);
    let (_, ext) = base.rsplit_once('.')?;

    let ext: String = ext
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(MAX_EXTENSION_LEN)
        .collect();

    if ext.is_empty() {
        None
    } else {
        Some(ext)
    }
}
