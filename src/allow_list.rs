use std::collections::HashSet;

/// Read-only set of client IP literals allowed to scrape metrics.
///
/// Entries are compared as opaque strings: `"::1"` and `"0:0:0:0:0:0:0:1"`
/// are different entries. An empty list contains nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    ips: HashSet<String>,
}

impl AllowList {
    /// Build an allow list from a sequence of IP literals
    pub fn new<I, S>(ips: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ips: ips.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, ip: &str) -> bool {
        self.ips.contains(ip)
    }

    pub fn len(&self) -> usize {
        self.ips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ips.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for AllowList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}
