mod common;

use common::document_assertions::{count_commands, page_texts, text_y};
use common::fixtures::*;
use common::{TestResult, generate, generate_with_config, init_logger};
use reportflow::{
    BandDisplay, Canvas, DocumentPaginator, DrawCommand, JsonContext, LayoutConfig, PageLayout, RecordingCanvas,
    ReportError,
};
use reportflow_layout::{Container, ElementBase, TextElement};
use reportflow_types::ElementId;
use serde_json::{Value, json};

fn close(a: f32, b: f32) -> bool {
    (a - b).abs() < 0.01
}

#[test]
fn test_single_text_on_one_page() -> TestResult {
    init_logger();

    let template = report_template(json!([]), vec![text(1, "0_content", 0.0, 0.0, 200.0, 20.0, "Hello")]);
    let doc = generate(&template, json!({}))?;

    assert_page_count!(doc, 1);
    assert_eq!(doc.page_width, 595.0);
    assert_eq!(doc.page_height, 842.0);
    assert_page_contains_text!(doc, 0, "Hello");
    // margin 20 + baseline at 0.8 of the 12pt font
    let y = text_y(&doc, 0, "Hello").ok_or("text not drawn")?;
    assert!(close(y, 29.6), "baseline at {}", y);
    Ok(())
}

#[test]
fn test_text_fits_region_of_fifty_points() -> TestResult {
    init_logger();

    let mut content = Container::new("0_content", 200.0, 50.0, true);
    content.add(TextElement::new(ElementBase::new(ElementId(1), 0.0, 0.0, 100.0, 20.0), "Hello"));
    let mut header = Container::new("0_header", 200.0, 0.0, false);
    let mut footer = Container::new("0_footer", 200.0, 0.0, false);

    let layout = PageLayout {
        page_width: 240.0,
        page_height: 90.0,
        margin_left: 20.0,
        margin_top: 20.0,
        margin_right: 20.0,
        margin_bottom: 20.0,
        header_size: 0.0,
        header_display: BandDisplay::Never,
        footer_size: 0.0,
        footer_display: BandDisplay::Never,
    };
    let mut ctx = JsonContext::new(Vec::new(), Value::Null);
    let mut canvas = RecordingCanvas::new(240.0, 90.0);
    let pages = DocumentPaginator::new(layout).paginate(&mut header, &mut content, &mut footer, &mut ctx, &mut canvas)?;

    assert_eq!(pages, 1);
    assert_eq!(canvas.page_count(), 1);
    let doc = canvas.finish();
    assert_eq!(page_texts(&doc, 0), vec!["Hello"]);
    Ok(())
}

#[test]
fn test_explicit_page_breaks() -> TestResult {
    init_logger();

    let template = report_template(
        json!([]),
        vec![
            text(1, "0_content", 0.0, 0.0, 200.0, 20.0, "First"),
            page_break(2, 30.0),
            text(3, "0_content", 0.0, 40.0, 200.0, 20.0, "Second"),
            page_break(4, 60.0),
            text(5, "0_content", 0.0, 70.0, 200.0, 20.0, "Third"),
        ],
    );
    let doc = generate(&template, json!({}))?;

    assert_page_count!(doc, 3);
    assert_eq!(page_texts(&doc, 0), vec!["First"]);
    assert_eq!(page_texts(&doc, 1), vec!["Second"]);
    assert_eq!(page_texts(&doc, 2), vec!["Third"]);
    // positioned relative to the page break
    let y = text_y(&doc, 1, "Second").ok_or("text not drawn")?;
    assert!(close(y, 20.0 + 10.0 + 9.6), "baseline at {}", y);
    Ok(())
}

#[test]
fn test_header_and_footer_display() -> TestResult {
    init_logger();

    let mut properties = document_properties();
    properties["header"] = json!(true);
    properties["headerDisplay"] = json!("not_on_first_page");
    properties["footer"] = json!(true);
    properties["footerDisplay"] = json!("always");

    let template = report_template_with_properties(
        properties,
        json!([]),
        vec![
            text(1, "0_header", 0.0, 0.0, 200.0, 20.0, "Page ${page_number} of ${page_count}"),
            text(2, "0_footer", 0.0, 0.0, 200.0, 20.0, "Footer"),
            text(3, "0_content", 0.0, 0.0, 200.0, 20.0, "First"),
            page_break(4, 30.0),
            text(5, "0_content", 0.0, 40.0, 200.0, 20.0, "Second"),
            page_break(6, 60.0),
            text(7, "0_content", 0.0, 70.0, 200.0, 20.0, "Third"),
        ],
    );
    let doc = generate(&template, json!({}))?;

    assert_page_count!(doc, 3);
    assert_page_lacks_text!(doc, 0, "Page 1 of 3");
    assert_page_contains_text!(doc, 1, "Page 2 of 3");
    assert_page_contains_text!(doc, 2, "Page 3 of 3");
    for page in 0..3 {
        assert_page_contains_text!(doc, page, "Footer");
    }

    // content moves below the header from the second page on
    let first = text_y(&doc, 0, "First").ok_or("text not drawn")?;
    let second = text_y(&doc, 1, "Second").ok_or("text not drawn")?;
    assert!(close(first, 29.6), "baseline at {}", first);
    assert!(close(second, 20.0 + 60.0 + 10.0 + 9.6), "baseline at {}", second);

    // footer sits above the bottom margin
    let footer = text_y(&doc, 0, "Footer").ok_or("text not drawn")?;
    assert!(close(footer, 842.0 - 20.0 - 40.0 + 9.6), "baseline at {}", footer);
    Ok(())
}

#[test]
fn test_table_flows_over_pages_with_repeated_header() -> TestResult {
    init_logger();

    let template = report_template(items_parameter(&[("name", "string"), ("price", "number")]), vec![items_table(10, 0.0)]);
    let doc = generate(&template, items(100))?;

    assert_page_count!(doc, 3);
    for page in 0..3 {
        assert_eq!(page_texts(&doc, page).first().map(String::as_str), Some("Name"));
    }
    assert_page_contains_text!(doc, 0, "Item 1");
    assert_page_contains_text!(doc, 2, "Item 100");

    let rows = count_commands(&doc, |c| matches!(c, DrawCommand::Text { text, .. } if text.starts_with("Item ")));
    assert_eq!(rows, 100);
    Ok(())
}

#[test]
fn test_table_batch_size_does_not_change_output() -> TestResult {
    init_logger();

    let template = report_template(items_parameter(&[("name", "string"), ("price", "number")]), vec![items_table(10, 0.0)]);
    let batched = |table_batch_size| LayoutConfig {
        table_batch_size,
        ..LayoutConfig::default()
    };
    let one = generate_with_config(&template, items(60), batched(1))?;
    let many = generate_with_config(&template, items(60), batched(25))?;
    assert_eq!(one, many);
    Ok(())
}

#[test]
fn test_pagination_runaway() -> TestResult {
    init_logger();

    let template = report_template(items_parameter(&[("name", "string"), ("price", "number")]), vec![items_table(10, 0.0)]);
    let config = LayoutConfig {
        max_page_attempts: 2,
        ..LayoutConfig::default()
    };
    match generate_with_config(&template, items(100), config) {
        Err(ReportError::PaginationRunaway { attempts }) => assert_eq!(attempts, 2),
        other => panic!("expected a runaway, got {:?}", other.map(|doc| doc.pages.len())),
    }
    Ok(())
}

#[test]
fn test_empty_template_has_one_page() -> TestResult {
    init_logger();

    let doc = generate(&report_template(json!([]), Vec::new()), json!({}))?;
    assert_page_count!(doc, 1);
    assert!(doc.pages[0].commands.is_empty());

    // the canvas trait object is usable directly as well
    let mut canvas = RecordingCanvas::new(100.0, 100.0);
    canvas.add_page();
    assert_eq!(canvas.page_count(), 1);
    Ok(())
}
