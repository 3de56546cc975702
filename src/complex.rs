use std::fmt::Display;

use crate::{
    Indicator, IndicatorCore, IndicatorError, IndicatorValue, ResetScope, Settings,
};

/// How a composite evaluates its children.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ComplexMode {
    /// Every child consumes the original input independently.
    Parallel,
    /// Each child consumes the previous child's result; the chain stops
    /// advancing at the first child that is still unformed.
    Sequence,
}

/// An indicator composed of named child indicators.
///
/// Children are owned behind the [`Indicator`] capability and evaluated
/// in declaration order. The result is a composite value exposing each
/// child's own result under the child's identity; the composite is
/// formed once every child is.
///
/// Reconfiguring children happens through the owning composite (see
/// [`replace_children`](Self::replace_children)), which resets the
/// whole tree — a child can never change under a composite's feet.
///
/// # Example
///
/// ```
/// use tideflow_ta::{ComplexIndicator, Indicator, Sma};
/// use rust_decimal::Decimal;
///
/// let mut pair = ComplexIndicator::parallel(
///     "Pair",
///     vec![Box::new(Sma::new(2)), Box::new(Sma::new(3))],
/// );
/// let fast = pair.child(0).id();
///
/// for n in 1..=3u64 {
///     pair.process_scalar(Decimal::from(n * 10), n, true);
/// }
///
/// let out = pair.history().current().unwrap().clone();
/// assert_eq!(out.inner(fast).to_decimal(), Decimal::from(25));
/// ```
pub struct ComplexIndicator {
    core: IndicatorCore,
    mode: ComplexMode,
    children: Vec<Box<dyn Indicator>>,
}

impl ComplexIndicator {
    /// Composite whose children all consume the same input.
    ///
    /// # Panics
    ///
    /// Panics if `children` is empty.
    #[must_use]
    pub fn parallel(name: impl Into<String>, children: Vec<Box<dyn Indicator>>) -> Self {
        Self::with_mode(name, ComplexMode::Parallel, children)
    }

    /// Composite whose children form a chain.
    ///
    /// # Panics
    ///
    /// Panics if `children` is empty.
    #[must_use]
    pub fn sequence(name: impl Into<String>, children: Vec<Box<dyn Indicator>>) -> Self {
        Self::with_mode(name, ComplexMode::Sequence, children)
    }

    /// Composite with an explicit mode.
    ///
    /// # Panics
    ///
    /// Panics if `children` is empty.
    #[must_use]
    pub fn with_mode(
        name: impl Into<String>,
        mode: ComplexMode,
        children: Vec<Box<dyn Indicator>>,
    ) -> Self {
        assert!(
            !children.is_empty(),
            "a composite indicator requires at least one child"
        );
        Self {
            core: IndicatorCore::new(name),
            mode,
            children,
        }
    }

    #[inline]
    #[must_use]
    pub fn mode(&self) -> ComplexMode {
        self.mode
    }

    #[must_use]
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Child by declaration order.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[must_use]
    pub fn child(&self, index: usize) -> &dyn Indicator {
        self.children[index].as_ref()
    }

    /// Children in declaration order.
    pub fn children(&self) -> impl Iterator<Item = &dyn Indicator> {
        self.children.iter().map(AsRef::as_ref)
    }

    /// Swaps in a new child set and resets the whole composite.
    ///
    /// This is the one way to reconfigure a composite's children: the
    /// old children are dropped, and the reset runs as the last effect.
    ///
    /// # Panics
    ///
    /// Panics if `children` is empty.
    pub fn replace_children(&mut self, children: Vec<Box<dyn Indicator>>) {
        assert!(
            !children.is_empty(),
            "a composite indicator requires at least one child"
        );
        self.children = children;
        self.reset();
    }
}

impl Indicator for ComplexIndicator {
    fn core(&self) -> &IndicatorCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut IndicatorCore {
        &mut self.core
    }

    fn num_values_to_initialize(&self) -> usize {
        let counts = self.children.iter().map(|c| c.num_values_to_initialize());
        match self.mode {
            ComplexMode::Parallel => counts.max().unwrap_or(0),
            // Each link consumes one formed value from its predecessor,
            // so warm-ups overlap by one sample per link.
            ComplexMode::Sequence => counts
                .sum::<usize>()
                .saturating_sub(self.children.len() - 1),
        }
    }

    fn calc(&mut self, input: &IndicatorValue) -> IndicatorValue {
        let mut result = IndicatorValue::complex(self.core.id(), input.time());

        match self.mode {
            ComplexMode::Parallel => {
                for child in &mut self.children {
                    let value = child.process(input);
                    result.insert_inner(child.id(), value);
                }
            }
            ComplexMode::Sequence => {
                let mut current = input.clone();
                for child in &mut self.children {
                    let value = child.process(&current);
                    let formed = child.is_formed();
                    result.insert_inner(child.id(), value.clone());
                    if !formed {
                        break;
                    }
                    current = value;
                }
            }
        }

        result
    }

    fn calc_is_formed(&self) -> bool {
        self.children.iter().all(|c| c.is_formed())
    }

    fn clear_state(&mut self) {}

    fn reset_children(&mut self, scope: &mut ResetScope) {
        for child in &mut self.children {
            child.reset_in(scope);
        }
    }

    fn save(&self, settings: &mut Settings) {
        let children: Vec<Settings> = self
            .children
            .iter()
            .map(|child| {
                let mut child_settings = Settings::new();
                child.save(&mut child_settings);
                child_settings
            })
            .collect();
        settings.put("children", &children);
    }

    fn load(&mut self, settings: &Settings) -> Result<(), IndicatorError> {
        let stored: Vec<Settings> = settings.get("children")?;
        if stored.len() != self.children.len() {
            return Err(IndicatorError::InvalidSetting {
                key: "children".into(),
                reason: format!(
                    "expected {} child entries, found {}",
                    self.children.len(),
                    stored.len()
                ),
            });
        }
        for (child, child_settings) in self.children.iter_mut().zip(&stored) {
            child.load(child_settings)?;
        }
        self.reset();
        Ok(())
    }
}

impl Display for ComplexIndicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[", self.core.name())?;
        for (i, child) in self.children.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", child.name())?;
        }
        write!(f, "]")
    }
}
