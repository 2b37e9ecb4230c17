use crate::test_utils::{init_logger, TestCanvas, TestContext};
use crate::{Container, ElementBase, Fragment, LayoutError, PageBreakElement, TextElement};
use reportflow_types::{ElementId, TextStyle};

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn lines(count: usize) -> String {
    (1..=count).map(|i| format!("line{i}")).collect::<Vec<_>>().join("\n")
}

fn text_at(id: u64, x: f32, y: f32, height: f32, content: &str) -> TextElement {
    TextElement::new(ElementBase::new(ElementId(id), x, y, 100.0, height), content)
        .with_style(TextStyle::default().with_font_size(10.0))
}

/// Runs `create_fragments` until the container completes and returns the
/// fragments of every page.
fn paginate(container: &mut Container, height: f32) -> Result<Vec<Vec<Fragment>>, LayoutError> {
    let mut ctx = TestContext::default();
    let mut canvas = TestCanvas::default();
    container.prepare(&mut ctx, Some(&mut canvas), false)?;
    let mut pages = Vec::new();
    for _ in 0..100 {
        let done = container.create_fragments(height, &mut ctx, &mut canvas)?;
        let fragments = container.take_fragments();
        pages.push(fragments.into_iter().filter(|f| !f.is_page_break()).collect());
        if done {
            break;
        }
    }
    Ok(pages)
}

#[test]
fn test_single_element_fits_on_one_page() -> TestResult {
    init_logger();
    let mut container = Container::new("0_content", 100.0, 50.0, true);
    container.add(text_at(1, 0.0, 0.0, 20.0, "Hello"));

    let pages = paginate(&mut container, 50.0)?;
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].len(), 1);
    assert_eq!(pages[0][0].render_bottom(), 20.0);
    Ok(())
}

#[test]
fn test_predecessor_graph_skips_covered_elements() -> TestResult {
    let mut container = Container::new("0_content", 300.0, 500.0, true);
    container.add(text_at(4, 0.0, 60.0, 10.0, "d"));
    container.add(text_at(1, 0.0, 0.0, 20.0, "a"));
    container.add(text_at(2, 150.0, 0.0, 20.0, "b"));
    container.add(text_at(3, 0.0, 30.0, 10.0, "c"));

    let mut ctx = TestContext::default();
    let mut canvas = TestCanvas::default();
    container.prepare(&mut ctx, Some(&mut canvas), false)?;

    let ids: Vec<u64> = container.elements().iter().map(|e| e.id().0).collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);
    // `c` is below both `a` and `b`; `d` only needs `c`, which covers the others.
    assert_eq!(container.predecessors(2), &[1, 0]);
    assert_eq!(container.predecessors(3), &[2]);
    assert_eq!(container.successors(0), &[2]);
    assert_eq!(container.successors(2), &[3]);
    Ok(())
}

#[test]
fn test_no_predecessor_graph_without_canvas() -> TestResult {
    let mut container = Container::new("0_content", 100.0, 100.0, true);
    container.add(text_at(1, 0.0, 0.0, 20.0, "a"));
    container.add(text_at(2, 0.0, 30.0, 20.0, "b"));

    let mut ctx = TestContext::default();
    container.prepare(&mut ctx, None, true)?;
    assert!(container.predecessors(1).is_empty());
    Ok(())
}

#[test]
fn test_successor_waits_for_split_predecessor() -> TestResult {
    init_logger();
    let mut container = Container::new("0_content", 100.0, 100.0, true);
    // 25 lines of 10 points: 100 + 100 + 50.
    container.add(text_at(1, 0.0, 0.0, 20.0, &lines(25)));
    container.add(text_at(2, 0.0, 30.0, 10.0, "after"));

    let pages = paginate(&mut container, 100.0)?;
    assert_eq!(pages.len(), 3);
    assert_eq!(pages[0].len(), 1);
    assert_eq!(pages[1].len(), 1);

    let last = &pages[2];
    assert_eq!(last.len(), 2);
    assert_eq!(last[0].render_bottom(), 50.0);
    // The declared gap of 10 is kept below the last slice.
    assert_eq!(last[1].render_y(), 60.0);
    for element in container.elements() {
        assert!(element.base().rendering_complete);
    }
    Ok(())
}

#[test]
fn test_side_by_side_elements_continue_independently() -> TestResult {
    let mut container = Container::new("0_content", 300.0, 100.0, true);
    container.add(text_at(1, 0.0, 0.0, 20.0, &lines(15)));
    container.add(text_at(2, 150.0, 0.0, 20.0, "short"));

    let pages = paginate(&mut container, 100.0)?;
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].len(), 2);
    assert_eq!(pages[1].len(), 1);
    assert_eq!(pages[1][0].height(), 50.0);
    Ok(())
}

#[test]
fn test_element_not_fitting_moves_to_next_page() -> TestResult {
    let mut container = Container::new("0_content", 100.0, 100.0, true);
    container.add(text_at(1, 0.0, 0.0, 80.0, "top"));
    container.add(text_at(2, 0.0, 85.0, 20.0, "below").with_always_print_on_same_page(true));

    let pages = paginate(&mut container, 100.0)?;
    assert_eq!(pages.len(), 2);
    // Not bound to an explicit page break, so the element starts at the top.
    assert_eq!(pages[1][0].render_y(), 0.0);
    Ok(())
}

#[test]
fn test_page_break_positions_following_content() -> TestResult {
    let mut container = Container::new("0_content", 100.0, 500.0, true);
    container.add(text_at(1, 0.0, 0.0, 20.0, "first"));
    container.add(PageBreakElement::new(ElementBase::new(ElementId(2), 0.0, 100.0, 0.0, 0.0)));
    container.add(text_at(3, 0.0, 130.0, 20.0, "second"));

    let pages = paginate(&mut container, 500.0)?;
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].len(), 1);
    assert_eq!(pages[1][0].render_y(), 30.0);
    Ok(())
}

#[test]
fn test_page_break_ends_container_without_page_breaks() -> TestResult {
    let mut container = Container::new("band", 100.0, 500.0, false);
    container.add(text_at(1, 0.0, 0.0, 20.0, "kept"));
    container.add(PageBreakElement::new(ElementBase::new(ElementId(2), 0.0, 30.0, 0.0, 0.0)));
    container.add(text_at(3, 0.0, 40.0, 20.0, "dropped"));

    let pages = paginate(&mut container, 500.0)?;
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].len(), 1);
    Ok(())
}

#[test]
fn test_hidden_element_keeps_or_removes_its_space() -> TestResult {
    for (remove_empty, expected_y) in [(false, 40.0), (true, 10.0)] {
        let mut container = Container::new("0_content", 100.0, 200.0, true);
        let hidden = TextElement::new(
            ElementBase::new(ElementId(1), 0.0, 0.0, 100.0, 30.0)
                .with_print_if("False")
                .with_remove_empty_element(remove_empty),
            "hidden",
        );
        container.add(hidden);
        container.add(text_at(2, 0.0, 40.0, 20.0, "visible"));

        let pages = paginate(&mut container, 200.0)?;
        assert_eq!(pages[0].len(), 1);
        assert_eq!(pages[0][0].render_y(), expected_y);
    }
    Ok(())
}

#[test]
fn test_complete_element_is_left_untouched() -> TestResult {
    let mut ctx = TestContext::default();
    let mut canvas = TestCanvas::default();
    let mut container = Container::new("0_content", 100.0, 100.0, true);
    container.add(text_at(1, 0.0, 0.0, 20.0, "once"));
    container.prepare(&mut ctx, Some(&mut canvas), false)?;
    assert!(container.create_fragments(100.0, &mut ctx, &mut canvas)?);

    let element = container.element_mut(0).ok_or("missing element")?;
    let before = element.base().clone();
    let (fragment, complete) = element.next_fragment(0.0, 100.0, &mut ctx, &mut canvas)?;
    assert!(fragment.is_none() && complete);
    assert_eq!(element.base(), &before);
    Ok(())
}

#[test]
fn test_render_draws_one_page_at_a_time() -> TestResult {
    let mut ctx = TestContext::default();
    let mut canvas = TestCanvas::default();
    let mut container = Container::new("0_content", 100.0, 100.0, true);
    container.add(text_at(1, 0.0, 0.0, 20.0, &lines(15)));
    container.prepare(&mut ctx, Some(&mut canvas), false)?;
    while !container.create_fragments(100.0, &mut ctx, &mut canvas)? {}

    container.render(0.0, 0.0, &mut canvas);
    assert_eq!(canvas.texts().len(), 10);
    assert!(!container.is_finished());
    container.render(0.0, 0.0, &mut canvas);
    assert_eq!(canvas.texts().len(), 15);
    assert!(container.is_finished());
    Ok(())
}

#[test]
fn test_element_too_large_at_page_top() {
    let mut container = Container::new("0_content", 100.0, 5.0, true);
    container.add(text_at(9, 0.0, 0.0, 20.0, "big"));
    let err = paginate(&mut container, 5.0).unwrap_err();
    assert_eq!(err.element_id(), ElementId(9));
}
