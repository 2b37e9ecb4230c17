use serde_json::{json, Value};

/// A4 portrait, 20pt margins, no page header or footer. The content band is
/// 555 x 802 points.
pub fn document_properties() -> Value {
    json!({
        "pageFormat": "A4",
        "orientation": "portrait",
        "marginLeft": 20, "marginTop": 20, "marginRight": 20, "marginBottom": 20,
        "header": false, "headerSize": 60, "headerDisplay": "always",
        "footer": false, "footerSize": 40, "footerDisplay": "always",
    })
}

pub fn report_template(parameters: Value, elements: Vec<Value>) -> Value {
    report_template_with_properties(document_properties(), parameters, elements)
}

pub fn report_template_with_properties(properties: Value, parameters: Value, elements: Vec<Value>) -> Value {
    json!({
        "version": 4,
        "documentProperties": properties,
        "parameters": parameters,
        "styles": [],
        "docElements": elements,
    })
}

pub fn text(id: u64, container: &str, x: f32, y: f32, width: f32, height: f32, content: &str) -> Value {
    json!({
        "elementType": "text", "id": id, "containerId": container,
        "x": x, "y": y, "width": width, "height": height,
        "content": content,
    })
}

pub fn page_break(id: u64, y: f32) -> Value {
    json!({
        "elementType": "page_break", "id": id, "containerId": "0_content",
        "x": 0, "y": y, "width": 0, "height": 0,
    })
}

/// Array parameter `items` with the given row fields.
pub fn items_parameter(fields: &[(&str, &str)]) -> Value {
    let children: Vec<Value> = fields
        .iter()
        .enumerate()
        .map(|(i, (name, kind))| json!({"id": 101 + i, "name": name, "type": kind}))
        .collect();
    json!([{"id": 100, "name": "items", "type": "array", "children": children}])
}

pub fn items(count: usize) -> Value {
    let rows: Vec<Value> = (1..=count)
        .map(|i| json!({"name": format!("Item {}", i), "price": i}))
        .collect();
    json!({"items": rows})
}

/// A one column table over `items` with a repeated header band.
pub fn items_table(id: u64, y: f32) -> Value {
    json!({
        "elementType": "table", "id": id, "containerId": "0_content",
        "x": 0, "y": y, "width": 300, "height": 40,
        "dataSource": "${items}", "columns": 1,
        "header": true, "footer": false,
        "headerData": {
            "id": id + 1, "height": 20, "repeatHeader": true,
            "columnData": [{"id": id + 2, "width": 300, "content": "Name"}]
        },
        "contentDataRows": [{
            "id": id + 3, "height": 20,
            "columnData": [{"id": id + 4, "width": 300, "content": "${name}"}]
        }]
    })
}
