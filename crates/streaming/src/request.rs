/// Identifies one issued place fetch.
///
/// Ids grow monotonically in issuance order, so "is this the current fetch"
/// is a plain equality check against the fetcher's in-flight id.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FetchId(pub u64);

impl std::fmt::Display for FetchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fetch#{}", self.0)
    }
}
