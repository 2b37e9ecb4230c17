//! A flow region: the elements of one band, frame or section row together
//! with the predecessor graph and the pagination cursor.

use crate::element::Element;
use crate::fragment::Fragment;
use crate::LayoutError;
use log::debug;
use reportflow_traits::{Canvas, EvaluationContext};
use reportflow_types::ContainerId;

/// Owns its elements in an arena; the predecessor/successor relation is kept
/// as adjacency lists of arena indices.
#[derive(Debug, Clone)]
pub struct Container {
    pub id: ContainerId,
    pub width: f32,
    pub height: f32,
    allow_page_break: bool,

    elements: Vec<Element>,
    predecessors: Vec<Vec<usize>>,
    successors: Vec<Vec<usize>>,
    /// Elements still to be laid out, in y order.
    queue: Vec<usize>,

    fragments: Vec<Fragment>,
    used_band_height: f32,
    explicit_page_break: bool,
    /// Page-local origin, the y of the last explicit page break.
    page_y: f32,
    /// Part of the flow already consumed on previous pages, for containers
    /// without page breaks.
    baseline_y: f32,
}

impl Container {
    pub fn new(id: impl Into<ContainerId>, width: f32, height: f32, allow_page_break: bool) -> Self {
        Self {
            id: id.into(),
            width,
            height,
            allow_page_break,
            elements: Vec::new(),
            predecessors: Vec::new(),
            successors: Vec::new(),
            queue: Vec::new(),
            fragments: Vec::new(),
            used_band_height: 0.0,
            explicit_page_break: true,
            page_y: 0.0,
            baseline_y: 0.0,
        }
    }

    pub fn add(&mut self, element: impl Into<Element>) {
        self.elements.push(element.into());
    }

    pub fn allows_page_break(&self) -> bool {
        self.allow_page_break
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn element(&self, index: usize) -> Option<&Element> {
        self.elements.get(index)
    }

    pub fn element_mut(&mut self, index: usize) -> Option<&mut Element> {
        self.elements.get_mut(index)
    }

    pub fn predecessors(&self, index: usize) -> &[usize] {
        self.predecessors.get(index).map_or(&[], Vec::as_slice)
    }

    pub fn successors(&self, index: usize) -> &[usize] {
        self.successors.get(index).map_or(&[], Vec::as_slice)
    }

    pub fn used_band_height(&self) -> f32 {
        self.used_band_height
    }

    pub(crate) fn set_used_band_height(&mut self, height: f32) {
        self.used_band_height = height;
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// Prepares all elements, sorts them by position and rebuilds the
    /// predecessor graph. Without a canvas no graph is needed.
    pub fn prepare(
        &mut self,
        ctx: &mut dyn EvaluationContext,
        mut canvas: Option<&mut dyn Canvas>,
        verify_only: bool,
    ) -> Result<(), LayoutError> {
        for element in &mut self.elements {
            element.prepare(ctx, canvas.as_mut().map(|c| &mut **c as &mut dyn Canvas), verify_only)?;
            element.base_mut().reset();
        }

        self.elements.sort_by(|a, b| {
            a.base()
                .y
                .total_cmp(&b.base().y)
                .then(a.sort_order().cmp(&b.sort_order()))
        });

        let count = self.elements.len();
        self.queue = (0..count).collect();
        self.predecessors = vec![Vec::new(); count];
        self.successors = vec![Vec::new(); count];
        if canvas.is_some() {
            self.build_predecessor_graph();
        }

        self.fragments.clear();
        self.used_band_height = 0.0;
        self.explicit_page_break = true;
        self.page_y = 0.0;
        self.baseline_y = 0.0;
        Ok(())
    }

    fn build_predecessor_graph(&mut self) {
        for i in 0..self.elements.len() {
            for j in (0..i).rev() {
                if self.elements[j].is_page_break() {
                    // Elements before a page break are on an earlier page.
                    break;
                }
                if self.is_predecessor(i, j) {
                    self.predecessors[i].push(j);
                    self.successors[j].push(i);
                }
            }
        }
    }

    /// `j` is a predecessor of `i` when it ends above `i` and is not already
    /// covered by the closest predecessor found so far.
    fn is_predecessor(&self, i: usize, j: usize) -> bool {
        let element = self.elements[i].base();
        let other = self.elements[j].base();
        element.y >= other.bottom()
            && self.predecessors[i]
                .first()
                .is_none_or(|&first| other.bottom() > self.elements[first].base().y)
    }

    fn has_uncompleted_predecessor(&self, index: usize) -> bool {
        self.predecessors[index]
            .iter()
            .any(|&p| !self.elements[p].base().rendering_complete)
    }

    fn offset_of(&self, index: usize) -> f32 {
        let base = self.elements[index].base();
        let predecessors = &self.predecessors[index];
        if !predecessors.is_empty() {
            // Keep the declared gap to every predecessor, chained across pages.
            predecessors
                .iter()
                .map(|&p| {
                    let predecessor = self.elements[p].base();
                    predecessor.render_bottom + (base.y - predecessor.bottom())
                })
                .fold(0.0, f32::max)
        } else if self.allow_page_break {
            if base.first_render_element && self.explicit_page_break {
                base.y - self.page_y
            } else {
                0.0
            }
        } else {
            (base.y - self.baseline_y).max(0.0)
        }
    }

    /// Lays out as much of the queued content as fits into `container_height`.
    /// Returns `true` once every element is complete.
    pub fn create_fragments(
        &mut self,
        container_height: f32,
        ctx: &mut dyn EvaluationContext,
        canvas: &mut dyn Canvas,
    ) -> Result<bool, LayoutError> {
        let mut i = 0;
        let mut new_page = false;
        let mut set_explicit_page_break = false;

        while !new_page && i < self.queue.len() {
            let index = self.queue[i];
            if self.has_uncompleted_predecessor(index) {
                new_page = true;
                continue;
            }

            if self.elements[index].is_page_break() {
                if !self.allow_page_break {
                    self.queue.clear();
                    return Ok(true);
                }
                self.queue.remove(i);
                let page_break = self.elements[index].base_mut();
                page_break.rendering_complete = true;
                self.page_y = page_break.y;
                new_page = true;
                set_explicit_page_break = true;
                continue;
            }

            let offset_y = self.offset_of(index);
            let element = &mut self.elements[index];
            let complete = if element.is_printed(&*ctx)? {
                if offset_y >= container_height {
                    new_page = true;
                    false
                } else {
                    let (fragment, complete) = element.next_fragment(offset_y, container_height, ctx, canvas)?;
                    if let Some(fragment) = fragment {
                        self.used_band_height = self.used_band_height.max(fragment.render_bottom());
                        self.fragments.push(fragment);
                    }
                    complete
                }
            } else {
                element.finish_empty_element(offset_y);
                true
            };

            if complete {
                self.queue.remove(i);
            } else {
                i += 1;
            }
        }

        // After a manual page break the next page is positioned relative to it.
        self.explicit_page_break = !self.allow_page_break || set_explicit_page_break;

        if !self.queue.is_empty() {
            if self.allow_page_break {
                self.fragments.push(Fragment::PageBreak);
            }
            self.sever_completed_predecessors();
            debug!(
                "Container {}: page full, {} element(s) continue on the next page",
                self.id,
                self.queue.len()
            );
        }
        Ok(self.queue.is_empty())
    }

    /// Drops links to predecessors that are complete. Links to predecessors
    /// still in progress stay, so a successor never unblocks early.
    fn sever_completed_predecessors(&mut self) {
        let Self {
            queue,
            elements,
            predecessors,
            successors,
            ..
        } = self;
        for &index in queue.iter() {
            predecessors[index].retain(|&p| {
                let completed = elements[p].base().rendering_complete;
                if completed {
                    successors[p].retain(|&s| s != index);
                }
                !completed
            });
        }
    }

    /// Renders the fragments of the current page and drops them.
    pub fn render(&mut self, offset_x: f32, offset_y: f32, canvas: &mut dyn Canvas) {
        let end = self
            .fragments
            .iter()
            .position(Fragment::is_page_break)
            .map_or(self.fragments.len(), |p| p + 1);
        for fragment in self.fragments.drain(..end) {
            fragment.render(offset_x, offset_y, canvas);
        }
    }

    /// True once every produced fragment has been rendered.
    pub fn is_finished(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn fragments_bottom(&self) -> f32 {
        self.fragments
            .iter()
            .map(Fragment::render_bottom)
            .fold(0.0, f32::max)
    }

    pub fn take_fragments(&mut self) -> Vec<Fragment> {
        std::mem::take(&mut self.fragments)
    }

    pub fn clear_fragments(&mut self) {
        self.fragments.clear();
        self.used_band_height = 0.0;
    }

    /// Moves the flow origin down by the height consumed on the previous page.
    pub fn advance_baseline(&mut self, consumed: f32) {
        self.baseline_y += consumed;
    }

    pub fn cleanup(&mut self) {
        for element in &mut self.elements {
            element.cleanup();
        }
    }
}
