use std::fmt;

/// First runtime version that ships the liveness-allocation API, i.e. the
/// protocol where the caller owns the world pause and supplies a grow/shrink
/// buffer allocator. Older runtimes bracket the pause themselves.
pub const LIVENESS_ALLOCATION_API: RuntimeVersion = RuntimeVersion::new(2021, 2, 0);

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct RuntimeVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl RuntimeVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> RuntimeVersion {
        RuntimeVersion {
            major,
            minor,
            patch,
        }
    }

    /// Parses version strings as reported by the runtime, e.g. `2021.2.0f1`
    /// or `5.6.3p2`. Missing components default to 0, trailing release
    /// suffixes are ignored.
    pub fn parse(text: &str) -> Option<RuntimeVersion> {
        let mut parts = text.trim().split('.');

        let major = leading_number(parts.next()?)?;
        let minor = match parts.next() {
            Some(part) => leading_number(part)?,
            None => 0,
        };
        let patch = match parts.next() {
            Some(part) => leading_number(part)?,
            None => 0,
        };

        Some(RuntimeVersion::new(major, minor, patch))
    }
}

impl fmt::Display for RuntimeVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

fn leading_number(text: &str) -> Option<u32> {
    let end = text
        .find(|ch: char| !ch.is_ascii_digit())
        .unwrap_or(text.len());
    text[..end].parse().ok()
}
