use super::ElementBase;
use crate::fragment::Fragment;

/// Explicit page break. Handled by the owning container, which removes it
/// and starts a new page measured from the break position.
#[derive(Debug, Clone)]
pub struct PageBreakElement {
    pub base: ElementBase,
}

impl PageBreakElement {
    pub fn new(base: ElementBase) -> Self {
        Self {
            base: ElementBase {
                x: 0.0,
                width: 0.0,
                height: 0.0,
                ..base
            },
        }
    }

    pub fn next_fragment(&mut self) -> (Option<Fragment>, bool) {
        self.base.rendering_complete = true;
        (None, true)
    }
}
