use std::fmt;
use std::sync::OnceLock;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Identifier carried by every container.
///
/// Generated ids look like `55dc815c-5911-4f49-8e0f-5f9a0a02cfcb`. They are
/// unique enough for layout bookkeeping and nothing more; do not use them as
/// secrets.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(String);

impl ContainerId {
    pub fn generate() -> Self { ContainerId(generate_long_uuid()) }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl From<&str> for ContainerId {
    fn from(s: &str) -> Self { ContainerId(s.to_owned()) }
}

impl From<String> for ContainerId {
    fn from(s: String) -> Self { ContainerId(s) }
}

impl PartialEq<str> for ContainerId {
    fn eq(&self, other: &str) -> bool { self.0 == other }
}

impl PartialEq<&str> for ContainerId {
    fn eq(&self, other: &&str) -> bool { self.0 == *other }
}

fn process_clock() -> &'static Instant {
    static START: OnceLock<Instant> = OnceLock::new();
    START.get_or_init(Instant::now)
}

/// Returns a fresh `xxxxxxxx-xxxx-4xxx-yxxx-xxxxxxxxxxxx` identifier.
///
/// Random bytes are folded with the wall clock and the process clock before
/// the version and variant bits are stamped, so two ids drawn in the same
/// nanosecond still differ by their random part.
pub fn generate_long_uuid() -> String {
    let wall = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let seed = wall.wrapping_add(process_clock().elapsed().as_nanos());

    let mut bytes: [u8; 16] = rand::random();
    for (byte, time) in bytes.iter_mut().zip(seed.to_le_bytes()) {
        *byte ^= time;
    }
    uuid::Builder::from_random_bytes(bytes).into_uuid().hyphenated().to_string()
}
