use crate::ring::StatWindow;
use crate::IndicatorError;

/// Period-sized rolling state for length-windowed indicators.
///
/// Owns a [`StatWindow`] whose capacity always equals the configured
/// period. The formed predicate for this family is simply "the window
/// is full". Changing the length revalidates first and clears the
/// window; the owning indicator is responsible for calling its own
/// `reset` as the last effect of the setter.
#[derive(Clone, Debug)]
pub struct WindowCore {
    length: usize,
    window: StatWindow,
}

impl WindowCore {
    /// Window with a running sum.
    ///
    /// # Panics
    ///
    /// Panics if `length` is zero.
    #[must_use]
    pub fn with_sum(length: usize) -> Self {
        assert!(length >= 1, "length must be at least 1");
        Self {
            length,
            window: StatWindow::new(length).with_sum(),
        }
    }

    /// Window with a running max.
    ///
    /// # Panics
    ///
    /// Panics if `length` is zero.
    #[must_use]
    pub fn with_max(length: usize) -> Self {
        assert!(length >= 1, "length must be at least 1");
        Self {
            length,
            window: StatWindow::new(length).with_max(),
        }
    }

    /// Window with a running min.
    ///
    /// # Panics
    ///
    /// Panics if `length` is zero.
    #[must_use]
    pub fn with_min(length: usize) -> Self {
        assert!(length >= 1, "length must be at least 1");
        Self {
            length,
            window: StatWindow::new(length).with_min(),
        }
    }

    /// The configured period.
    #[inline]
    #[must_use]
    pub fn length(&self) -> usize {
        self.length
    }

    /// Replaces the period, clearing the window.
    ///
    /// # Errors
    ///
    /// [`IndicatorError::InvalidLength`] when `length` is zero; state is
    /// untouched.
    pub fn set_length(&mut self, length: usize) -> Result<(), IndicatorError> {
        if length == 0 {
            return Err(IndicatorError::InvalidLength(length));
        }
        self.length = length;
        self.window.set_capacity(length);
        Ok(())
    }

    /// Whether the window holds a full period of committed samples.
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.window.is_full()
    }

    #[inline]
    #[must_use]
    pub fn window(&self) -> &StatWindow {
        &self.window
    }

    #[inline]
    pub fn window_mut(&mut self) -> &mut StatWindow {
        &mut self.window
    }

    pub fn clear(&mut self) {
        self.window.clear();
    }
}
