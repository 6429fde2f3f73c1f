//! Default/manual value pairs.
//!
//! Values written by the system (an import row or an upstream signal) go into
//! `default`. Values typed in by a person go into `manual`. Both stay stored so
//! that the system-authored value remains visible after it has been overridden.

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct Overridable<T> {
    #[n(0)]
    pub default: Option<T>,
    #[n(1)]
    pub manual: Option<T>,
}

impl<T> Default for Overridable<T> {
    fn default() -> Self {
        Self {
            default: None,
            manual: None,
        }
    }
}

impl<T> Overridable<T> {
    pub fn new(default: Option<T>) -> Self {
        Self {
            default,
            manual: None,
        }
    }

    pub fn with_default(value: T) -> Self {
        Self::new(Some(value))
    }

    /// The manual value when one is set, otherwise the default.
    pub fn effective(&self) -> Option<&T> {
        self.manual.as_ref().or(self.default.as_ref())
    }

    pub fn into_effective(self) -> Option<T> {
        self.manual.or(self.default)
    }

    pub fn set_manual(&mut self, value: T) {
        self.manual = Some(value);
    }

    /// Stores `value` as the manual override when present; `None` leaves the pair untouched.
    pub fn override_with(&mut self, value: Option<T>) {
        if let Some(value) = value {
            self.manual = Some(value);
        }
    }

    pub fn clear_manual(&mut self) -> Option<T> {
        self.manual.take()
    }

    pub fn is_overridden(&self) -> bool {
        self.manual.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.default.is_none() && self.manual.is_none()
    }
}

impl<T: Copy> Overridable<T> {
    pub fn effective_copied(&self) -> Option<T> {
        self.effective().copied()
    }
}

impl Overridable<String> {
    pub fn effective_str(&self) -> Option<&str> {
        self.effective().map(String::as_str)
    }
}
