use serde::Serialize;

/// Limit/offset pair shared by every list operation.
///
/// The fields are private so that every value passes through [`new`],
/// [`from_query`] or [`Default`], which clamp `limit` into `[0, MAX_LIMIT]`
/// and `offset` to `>= 0`. Missing or non-numeric query inputs fall back to
/// the defaults (`limit = 50`, `offset = 0`). Query parsing is strict: a
/// value such as `12abc` or `1.5` counts as non-numeric.
///
/// [`new`]: PageRequest::new
/// [`from_query`]: PageRequest::from_query
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    limit: u32,
    offset: u64,
}

impl PageRequest {
    pub const DEFAULT_LIMIT: u32 = 50;
    pub const MAX_LIMIT: u32 = 100;

    /// Build a page from raw, possibly out-of-range numbers.
    pub fn new(limit: i64, offset: i64) -> Self {
        let limit = limit.clamp(0, i64::from(Self::MAX_LIMIT));
        let offset = offset.max(0);
        Self {
            limit: u32::try_from(limit).unwrap_or(Self::DEFAULT_LIMIT),
            offset: u64::try_from(offset).unwrap_or(0),
        }
    }

    /// Build a page from untrusted query-string values.
    pub fn from_query(limit: Option<&str>, offset: Option<&str>) -> Self {
        let limit = parse_or(limit, i64::from(Self::DEFAULT_LIMIT));
        let offset = parse_or(offset, 0);
        Self::new(limit, offset)
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Apply this page to an already-ordered sequence.
    pub fn slice<T>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        let skip = usize::try_from(self.offset).unwrap_or(usize::MAX);
        items
            .into_iter()
            .skip(skip)
            .take(self.limit as usize)
            .collect()
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            limit: Self::DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

fn parse_or(raw: Option<&str>, default: i64) -> i64 {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .unwrap_or(default)
}
