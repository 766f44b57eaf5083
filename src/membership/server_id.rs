use std::fmt;

/// ServerId identifies one replica in the cluster. The master hands these out when a replica
/// joins, and followers derive their listening port from it.
#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct ServerId(u32);

impl ServerId {
    pub fn new(id: u32) -> Self {
        ServerId(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }

    pub(crate) fn next(&self) -> Self {
        ServerId(self.0 + 1)
    }
}

impl fmt::Debug for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
