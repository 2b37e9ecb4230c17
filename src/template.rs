//! Report templates: `serde` definitions of the template JSON and the
//! builder that turns them into the header, content and footer containers.
//!
//! A template lists its elements flat, each one naming the container it is
//! placed in. The three page bands use the fixed ids `0_header`,
//! `0_content` and `0_footer`; frames and section bands link their own
//! container through `linkedContainerId`.

use crate::error::{ReportError, TemplateError};
use crate::paginator::PageLayout;
use log::{debug, warn};
use reportflow_layout::{
    BarCodeElement, Container, Element, ElementBase, FrameElement, ImageElement, LayoutConfig, LineElement,
    PageBreakElement, SectionBand, SectionElement, TableBand, TableColumn, TableElement, TextElement,
};
use reportflow_types::{
    BandDisplay, BorderStyle, Color, ContainerId, ElementId, HorizontalAlignment, Parameter, Size, TableBorder,
    TextStyle, VerticalAlignment,
};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};

pub const HEADER_CONTAINER: &str = "0_header";
pub const CONTENT_CONTAINER: &str = "0_content";
pub const FOOTER_CONTAINER: &str = "0_footer";

const POINTS_PER_INCH: f32 = 72.0;
const MM_PER_INCH: f32 = 25.4;
const GEOMETRY_TOLERANCE: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageFormat {
    #[default]
    #[serde(alias = "A4")]
    A4,
    #[serde(alias = "A5")]
    A5,
    #[serde(alias = "Letter", alias = "LETTER")]
    Letter,
    #[serde(other)]
    UserDefined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    Mm,
    Inch,
}

/// Page format, margins and the page header/footer bands.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentProperties {
    pub page_format: PageFormat,
    pub orientation: Orientation,
    /// Unit of `page_width`/`page_height` for user defined formats.
    pub unit: Unit,
    #[serde(deserialize_with = "lenient::number")]
    pub page_width: f32,
    #[serde(deserialize_with = "lenient::number")]
    pub page_height: f32,
    /// Height of the content band in the designer; derived from the page
    /// when zero.
    #[serde(deserialize_with = "lenient::number")]
    pub content_height: f32,
    #[serde(deserialize_with = "lenient::number")]
    pub margin_left: f32,
    #[serde(deserialize_with = "lenient::number")]
    pub margin_top: f32,
    #[serde(deserialize_with = "lenient::number")]
    pub margin_right: f32,
    #[serde(deserialize_with = "lenient::number")]
    pub margin_bottom: f32,
    pub header: bool,
    #[serde(deserialize_with = "lenient::number")]
    pub header_size: f32,
    pub header_display: BandDisplay,
    pub footer: bool,
    #[serde(deserialize_with = "lenient::number")]
    pub footer_size: f32,
    pub footer_display: BandDisplay,
    pub pattern_currency_symbol: String,
}

impl Default for DocumentProperties {
    fn default() -> Self {
        Self {
            page_format: PageFormat::A4,
            orientation: Orientation::Portrait,
            unit: Unit::Mm,
            page_width: 0.0,
            page_height: 0.0,
            content_height: 0.0,
            margin_left: 0.0,
            margin_top: 0.0,
            margin_right: 0.0,
            margin_bottom: 0.0,
            header: false,
            header_size: 0.0,
            header_display: BandDisplay::Always,
            footer: false,
            footer_size: 0.0,
            footer_display: BandDisplay::Always,
            pattern_currency_symbol: "$".to_string(),
        }
    }
}

impl DocumentProperties {
    /// Page size in points, rounded to whole points.
    pub fn page_size(&self) -> Size {
        let (width, height) = match self.page_format {
            PageFormat::A4 => (mm_to_points(210.0), mm_to_points(297.0)),
            PageFormat::A5 => (mm_to_points(148.0), mm_to_points(210.0)),
            PageFormat::Letter => (612.0, 792.0),
            PageFormat::UserDefined => match self.unit {
                Unit::Mm => (mm_to_points(self.page_width), mm_to_points(self.page_height)),
                Unit::Inch => (
                    (self.page_width * POINTS_PER_INCH).round(),
                    (self.page_height * POINTS_PER_INCH).round(),
                ),
            },
        };
        match self.orientation {
            Orientation::Portrait => Size::new(width, height),
            Orientation::Landscape => Size::new(height, width),
        }
    }

    pub fn header_size(&self) -> f32 {
        if self.header { self.header_size } else { 0.0 }
    }

    pub fn footer_size(&self) -> f32 {
        if self.footer { self.footer_size } else { 0.0 }
    }

    pub fn header_display(&self) -> BandDisplay {
        if self.header { self.header_display } else { BandDisplay::Never }
    }

    pub fn footer_display(&self) -> BandDisplay {
        if self.footer { self.footer_display } else { BandDisplay::Never }
    }

    pub fn content_width(&self) -> f32 {
        self.page_size().width - self.margin_left - self.margin_right
    }

    pub fn content_height(&self) -> f32 {
        if self.content_height > 0.0 {
            return self.content_height;
        }
        self.page_size().height - self.header_size() - self.footer_size() - self.margin_top - self.margin_bottom
    }

    pub fn currency_symbol(&self) -> &str {
        &self.pattern_currency_symbol
    }

    pub fn page_layout(&self) -> PageLayout {
        let size = self.page_size();
        PageLayout {
            page_width: size.width,
            page_height: size.height,
            margin_left: self.margin_left,
            margin_top: self.margin_top,
            margin_right: self.margin_right,
            margin_bottom: self.margin_bottom,
            header_size: self.header_size(),
            header_display: self.header_display(),
            footer_size: self.footer_size(),
            footer_display: self.footer_display(),
        }
    }

    fn validate(&self, errors: &mut Vec<TemplateError>) {
        if self.page_format == PageFormat::UserDefined {
            let (min, max) = match self.unit {
                Unit::Mm => (100.0, 100_000.0),
                Unit::Inch => (1.0, 1000.0),
            };
            let valid = |v: f32| (min..max).contains(&v);
            if !valid(self.page_width) || !valid(self.page_height) {
                errors.push(TemplateError::new(
                    format!("invalid page size {}x{}", self.page_width, self.page_height),
                    ElementId::DOCUMENT,
                    "page",
                ));
            }
        }
        let size = self.page_size();
        if self.margin_left + self.margin_right >= size.width {
            errors.push(TemplateError::new("margins exceed the page width", ElementId::DOCUMENT, "page"));
        }
        if self.content_height() <= 0.0 {
            errors.push(TemplateError::new(
                "header, footer and margins leave no room for content",
                ElementId::DOCUMENT,
                "page",
            ));
        }
    }
}

fn mm_to_points(mm: f32) -> f32 {
    (mm * POINTS_PER_INCH / MM_PER_INCH).round()
}

/// Lenient number parsing: template tools write geometry both as numbers
/// and as numeric strings.
mod lenient {
    use serde::{Deserialize, Deserializer, de};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw<T> {
        Num(T),
        Str(String),
    }

    pub fn number<'de, D>(deserializer: D) -> Result<f32, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Raw<f32>>::deserialize(deserializer)? {
            None => Ok(0.0),
            Some(Raw::Num(n)) => Ok(n),
            Some(Raw::Str(s)) if s.trim().is_empty() => Ok(0.0),
            Some(Raw::Str(s)) => s.trim().parse().map_err(de::Error::custom),
        }
    }

    /// Style ids are numbers, or empty strings for "no style".
    pub fn optional_id<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Raw<u64>>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Raw::Num(n)) => Ok(Some(n)),
            Some(Raw::Str(s)) if s.trim().is_empty() => Ok(None),
            Some(Raw::Str(s)) => s.trim().parse().map(Some).map_err(de::Error::custom),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CommonDef {
    id: ElementId,
    container_id: Option<ContainerId>,
    #[serde(deserialize_with = "lenient::number")]
    x: f32,
    #[serde(deserialize_with = "lenient::number")]
    y: f32,
    #[serde(deserialize_with = "lenient::number")]
    width: f32,
    #[serde(deserialize_with = "lenient::number")]
    height: f32,
    print_if: String,
    remove_empty_element: bool,
}

impl CommonDef {
    fn base(&self) -> ElementBase {
        ElementBase::new(self.id, self.x, self.y, self.width, self.height)
            .with_print_if(self.print_if.clone())
            .with_remove_empty_element(self.remove_empty_element)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct TextDef {
    #[serde(flatten)]
    common: CommonDef,
    content: String,
    eval: bool,
    pattern: String,
    link: String,
    #[serde(deserialize_with = "lenient::optional_id")]
    style_id: Option<u64>,
    #[serde(rename = "cs_condition")]
    cs_condition: String,
    #[serde(rename = "cs_styleId", deserialize_with = "lenient::optional_id")]
    cs_style_id: Option<u64>,
    always_print_on_same_page: bool,
    #[serde(flatten)]
    style: TextStyle,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct LineDef {
    #[serde(flatten)]
    common: CommonDef,
    #[serde(deserialize_with = "reportflow_types::color::deserialize_optional")]
    color: Option<Color>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ImageDef {
    #[serde(flatten)]
    common: CommonDef,
    source: String,
    content: String,
    image: String,
    image_filename: String,
    horizontal_alignment: HorizontalAlignment,
    vertical_alignment: VerticalAlignment,
    #[serde(deserialize_with = "reportflow_types::color::deserialize_optional")]
    background_color: Option<Color>,
    link: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct BarCodeDef {
    #[serde(flatten)]
    common: CommonDef,
    content: String,
    format: String,
    display_value: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PageBreakDef {
    #[serde(flatten)]
    common: CommonDef,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ColumnDef {
    id: ElementId,
    #[serde(deserialize_with = "lenient::number")]
    width: f32,
    content: String,
    eval: bool,
    pattern: String,
    link: String,
    print_if: String,
    #[serde(deserialize_with = "lenient::optional_id")]
    style_id: Option<u64>,
    #[serde(rename = "cs_condition")]
    cs_condition: String,
    #[serde(rename = "cs_styleId", deserialize_with = "lenient::optional_id")]
    cs_style_id: Option<u64>,
    #[serde(flatten)]
    style: TextStyle,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct TableBandDef {
    id: ElementId,
    #[serde(deserialize_with = "lenient::number")]
    height: f32,
    repeat_header: bool,
    #[serde(deserialize_with = "reportflow_types::color::deserialize_optional")]
    background_color: Option<Color>,
    #[serde(deserialize_with = "reportflow_types::color::deserialize_optional")]
    alternate_background_color: Option<Color>,
    column_data: Vec<ColumnDef>,
    group_expression: String,
    print_if: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct TableDef {
    #[serde(flatten)]
    common: CommonDef,
    data_source: String,
    /// Number of columns in use; extra column definitions are ignored.
    columns: Option<usize>,
    header: bool,
    footer: bool,
    header_data: Option<TableBandDef>,
    #[serde(alias = "contentData")]
    content_data_rows: Vec<TableBandDef>,
    footer_data: Option<TableBandDef>,
    border: TableBorder,
    #[serde(deserialize_with = "reportflow_types::color::deserialize_optional")]
    border_color: Option<Color>,
    #[serde(deserialize_with = "lenient::number")]
    border_width: f32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct FrameDef {
    #[serde(flatten)]
    common: CommonDef,
    linked_container_id: Option<ContainerId>,
    #[serde(deserialize_with = "reportflow_types::color::deserialize_optional")]
    background_color: Option<Color>,
    shrink_to_content_height: bool,
    #[serde(flatten)]
    border: BorderStyle,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SectionBandDef {
    id: ElementId,
    #[serde(deserialize_with = "lenient::number")]
    height: f32,
    linked_container_id: Option<ContainerId>,
    repeat_header: bool,
    always_print_on_same_page: bool,
    shrink_to_content_height: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SectionDef {
    #[serde(flatten)]
    common: CommonDef,
    data_source: String,
    header: bool,
    footer: bool,
    header_data: Option<SectionBandDef>,
    content_data: SectionBandDef,
    footer_data: Option<SectionBandDef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "elementType", rename_all = "snake_case")]
enum ElementDef {
    Text(TextDef),
    Line(LineDef),
    Image(ImageDef),
    BarCode(BarCodeDef),
    Table(TableDef),
    PageBreak(PageBreakDef),
    Frame(FrameDef),
    Section(SectionDef),
    #[serde(other)]
    Unsupported,
}

impl ElementDef {
    fn common(&self) -> Option<&CommonDef> {
        match self {
            ElementDef::Text(d) => Some(&d.common),
            ElementDef::Line(d) => Some(&d.common),
            ElementDef::Image(d) => Some(&d.common),
            ElementDef::BarCode(d) => Some(&d.common),
            ElementDef::Table(d) => Some(&d.common),
            ElementDef::PageBreak(d) => Some(&d.common),
            ElementDef::Frame(d) => Some(&d.common),
            ElementDef::Section(d) => Some(&d.common),
            ElementDef::Unsupported => None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StyleDef {
    #[serde(deserialize_with = "lenient::optional_id")]
    id: Option<u64>,
    #[serde(flatten)]
    style: TextStyle,
}

/// A deserialized report template.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportDefinition {
    pub version: u32,
    pub document_properties: DocumentProperties,
    pub parameters: Vec<Parameter>,
    styles: Vec<StyleDef>,
    doc_elements: Vec<ElementDef>,
}

/// A template ready for layout.
#[derive(Debug, Clone)]
pub struct Template {
    pub properties: DocumentProperties,
    pub parameters: Vec<Parameter>,
    pub header: Container,
    pub content: Container,
    pub footer: Container,
}

impl ReportDefinition {
    pub fn from_json(json: &str) -> Result<Self, ReportError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Builds the page band containers. Fails with every problem found.
    pub fn build(self, config: &LayoutConfig) -> Result<Template, ReportError> {
        let mut errors = Vec::new();
        self.document_properties.validate(&mut errors);
        validate_parameters(&self.parameters, &mut errors);

        let styles = self
            .styles
            .into_iter()
            .filter_map(|def| def.id.map(|id| (id, def.style)))
            .collect();

        let mut elements: HashMap<ContainerId, Vec<ElementDef>> = HashMap::new();
        for def in self.doc_elements {
            match def.common().and_then(|c| c.container_id.clone()) {
                Some(container_id) => elements.entry(container_id).or_default().push(def),
                None => warn!("Element without container is ignored: {:?}", def.common().map(|c| c.id)),
            }
        }

        let properties = self.document_properties;
        let mut builder = TemplateBuilder {
            config,
            styles,
            elements,
            active: Vec::new(),
            linked: HashSet::new(),
            errors,
        };

        let width = properties.content_width();
        let header = builder.page_band(HEADER_CONTAINER, width, properties.header_size(), properties.header);
        let content = builder.page_band(CONTENT_CONTAINER, width, properties.content_height(), true);
        let footer = builder.page_band(FOOTER_CONTAINER, width, properties.footer_size(), properties.footer);

        for orphan in builder.elements.keys() {
            debug!("Container '{}' is not linked by any element, its elements are ignored", orphan);
        }
        if !builder.errors.is_empty() {
            return Err(ReportError::InvalidTemplate(builder.errors));
        }
        Ok(Template {
            properties,
            parameters: self.parameters,
            header,
            content,
            footer,
        })
    }
}

fn validate_parameters(parameters: &[Parameter], errors: &mut Vec<TemplateError>) {
    let mut names = HashSet::new();
    for parameter in parameters {
        if !names.insert(parameter.name.as_str()) {
            errors.push(TemplateError::new(
                format!("duplicate parameter '{}'", parameter.name),
                parameter.id,
                "name",
            ));
        }
        let valid_name = parameter.name.chars().next().is_some_and(|c| c.is_alphabetic() || c == '_')
            && parameter.name.chars().all(|c| c.is_alphanumeric() || c == '_');
        if !valid_name {
            errors.push(TemplateError::new(
                format!("invalid parameter name '{}'", parameter.name),
                parameter.id,
                "name",
            ));
        }
        if parameter.is_computed() && !parameter.is_internal() && parameter.expression.trim().is_empty() {
            errors.push(TemplateError::new(
                format!("parameter '{}' has no expression", parameter.name),
                parameter.id,
                "expression",
            ));
        }
        validate_parameters(&parameter.children, errors);
    }
}

struct TemplateBuilder<'a> {
    config: &'a LayoutConfig,
    styles: HashMap<u64, TextStyle>,
    elements: HashMap<ContainerId, Vec<ElementDef>>,
    /// Containers currently being built, innermost last.
    active: Vec<ContainerId>,
    linked: HashSet<ContainerId>,
    errors: Vec<TemplateError>,
}

impl TemplateBuilder<'_> {
    fn page_band(&mut self, id: &str, width: f32, height: f32, visible: bool) -> Container {
        let mut container = Container::new(id, width, height, id == CONTENT_CONTAINER);
        let owner = ElementId::DOCUMENT;
        for element in self.container_elements(&ContainerId::from(id), width, height, visible, owner) {
            container.add(element);
        }
        container
    }

    fn error(&mut self, message: impl Into<String>, element_id: ElementId, field: &str) {
        self.errors.push(TemplateError::new(message, element_id, field));
    }

    /// Builds the elements placed in `container_id`. Geometry is only
    /// validated for visible containers.
    fn container_elements(
        &mut self,
        container_id: &ContainerId,
        width: f32,
        height: f32,
        check_geometry: bool,
        owner: ElementId,
    ) -> Vec<Element> {
        if self.active.contains(container_id) {
            self.error(
                format!("container '{}' contains itself", container_id),
                owner,
                "linkedContainerId",
            );
            return Vec::new();
        }
        if !self.linked.insert(container_id.clone()) {
            self.error(
                format!("container '{}' is linked more than once", container_id),
                owner,
                "linkedContainerId",
            );
            return Vec::new();
        }

        let defs = self.elements.remove(container_id).unwrap_or_default();
        self.active.push(container_id.clone());
        let mut elements = Vec::with_capacity(defs.len());
        for def in defs {
            if let Some(common) = def.common()
                && check_geometry
                && !matches!(def, ElementDef::PageBreak(_))
            {
                self.check_geometry(common, width, height);
            }
            if let Some(element) = self.element(def) {
                elements.push(element);
            }
        }
        self.active.pop();
        elements
    }

    fn check_geometry(&mut self, common: &CommonDef, width: f32, height: f32) {
        if common.x < 0.0 {
            self.error("element has a negative x position", common.id, "position");
        } else if common.x + common.width > width + GEOMETRY_TOLERANCE {
            self.error(
                format!("element exceeds the container width of {}", width),
                common.id,
                "position",
            );
        }
        if common.y < 0.0 {
            self.error("element has a negative y position", common.id, "position");
        } else if common.y + common.height > height + GEOMETRY_TOLERANCE {
            self.error(
                format!("element exceeds the container height of {}", height),
                common.id,
                "position",
            );
        }
    }

    fn style(&self, style_id: Option<u64>, inline: &TextStyle, element_id: ElementId) -> TextStyle {
        match style_id {
            Some(id) => self.styles.get(&id).cloned().unwrap_or_else(|| {
                warn!("Style {} of element {} not found, using the inline style", id, element_id);
                inline.clone()
            }),
            None => inline.clone(),
        }
    }

    fn conditional_style(&self, condition: &str, style_id: Option<u64>, element_id: ElementId) -> Option<TextStyle> {
        if condition.trim().is_empty() {
            return None;
        }
        let style = style_id.and_then(|id| self.styles.get(&id).cloned());
        if style.is_none() {
            warn!("Conditional style of element {} not found", element_id);
        }
        style
    }

    fn element(&mut self, def: ElementDef) -> Option<Element> {
        let element: Element = match def {
            ElementDef::Text(def) => self.text(def).into(),
            ElementDef::Line(def) => LineElement::new(def.common.base(), def.color.unwrap_or(Color::BLACK)).into(),
            ElementDef::Image(def) => {
                let mut image = ImageElement::new(def.common.base())
                    .with_source(def.source)
                    .with_static_image(def.image, def.image_filename)
                    .with_alignment(def.horizontal_alignment, def.vertical_alignment);
                image.content = def.content;
                image.background_color = def.background_color;
                image.link = def.link;
                image.into()
            }
            ElementDef::BarCode(def) => {
                if !def.format.is_empty() && !def.format.eq_ignore_ascii_case("code128") {
                    self.error(
                        format!("unsupported barcode format '{}'", def.format),
                        def.common.id,
                        "format",
                    );
                    return None;
                }
                BarCodeElement::new(def.common.base(), def.content, def.display_value).into()
            }
            ElementDef::PageBreak(def) => PageBreakElement::new(def.common.base()).into(),
            ElementDef::Table(def) => self.table(def)?.into(),
            ElementDef::Frame(def) => self.frame(def)?.into(),
            ElementDef::Section(def) => self.section(def)?.into(),
            ElementDef::Unsupported => {
                warn!("Unsupported element type is ignored");
                return None;
            }
        };
        Some(element)
    }

    fn text(&self, def: TextDef) -> TextElement {
        let id = def.common.id;
        let style = self.style(def.style_id, &def.style, id);
        let mut text = TextElement::new(def.common.base(), def.content)
            .with_style(style)
            .with_eval(def.eval)
            .with_pattern(def.pattern)
            .with_link(def.link)
            .with_always_print_on_same_page(def.always_print_on_same_page);
        if let Some(cs) = self.conditional_style(&def.cs_condition, def.cs_style_id, id) {
            text = text.with_conditional_style(def.cs_condition, cs);
        }
        text
    }

    fn table_column(&self, def: ColumnDef) -> TableColumn {
        let style = self.style(def.style_id, &def.style, def.id);
        let mut column = TableColumn::new(def.id, def.width, def.content)
            .with_style(style)
            .with_eval(def.eval)
            .with_pattern(def.pattern)
            .with_link(def.link)
            .with_print_if(def.print_if);
        if let Some(cs) = self.conditional_style(&def.cs_condition, def.cs_style_id, def.id) {
            column = column.with_conditional_style(def.cs_condition, cs);
        }
        column
    }

    fn table_columns(&self, def: &mut TableBandDef, count: Option<usize>) -> Vec<TableColumn> {
        let count = count.unwrap_or(def.column_data.len());
        std::mem::take(&mut def.column_data)
            .into_iter()
            .take(count)
            .map(|column| self.table_column(column))
            .collect()
    }

    fn table(&mut self, def: TableDef) -> Option<TableElement> {
        let id = def.common.id;
        if def.content_data_rows.is_empty() {
            self.error("table has no content band", id, "contentDataRows");
            return None;
        }

        let mut table = TableElement::new(def.common.base(), def.data_source)
            .with_border(def.border, def.border_color.unwrap_or(Color::BLACK), def.border_width)
            .with_batch_size(self.config.table_batch_size);

        if def.header
            && let Some(mut band) = def.header_data
        {
            let columns = self.table_columns(&mut band, def.columns);
            table = table.with_header(
                TableBand::header(band.id, band.height, columns)
                    .with_repeat_header(band.repeat_header)
                    .with_background(band.background_color),
            );
        }
        for mut band in def.content_data_rows {
            let columns = self.table_columns(&mut band, def.columns);
            table = table.with_content_band(
                TableBand::content(band.id, band.height, columns)
                    .with_background(band.background_color)
                    .with_alternate_background(band.alternate_background_color)
                    .with_group_expression(band.group_expression)
                    .with_print_if(band.print_if),
            );
        }
        if def.footer
            && let Some(mut band) = def.footer_data
        {
            let columns = self.table_columns(&mut band, def.columns);
            table = table.with_footer(
                TableBand::footer(band.id, band.height, columns).with_background(band.background_color),
            );
        }
        Some(table)
    }

    fn frame(&mut self, def: FrameDef) -> Option<FrameElement> {
        let id = def.common.id;
        let Some(container_id) = def.linked_container_id else {
            self.error("frame has no linked container", id, "linkedContainerId");
            return None;
        };
        let mut frame = FrameElement::new(def.common.base())
            .with_border(def.border)
            .with_background(def.background_color)
            .with_shrink_to_content(def.shrink_to_content_height);
        for element in self.container_elements(&container_id, def.common.width, def.common.height, true, id) {
            frame.add(element);
        }
        Some(frame)
    }

    fn section_band(&mut self, def: SectionBandDef, band: SectionBand, width: f32, section_id: ElementId) -> SectionBand {
        let mut band = band
            .with_always_print_on_same_page(def.always_print_on_same_page)
            .with_shrink_to_content(def.shrink_to_content_height);
        match def.linked_container_id {
            Some(container_id) => {
                for element in self.container_elements(&container_id, width, def.height, true, section_id) {
                    band.add(element);
                }
            }
            None => warn!("Band {} of section {} has no linked container", def.id, section_id),
        }
        band
    }

    fn section(&mut self, def: SectionDef) -> Option<SectionElement> {
        let id = def.common.id;
        let width = def.common.width;

        let content_def = def.content_data;
        let content = SectionBand::content(content_def.id, content_def.height);
        let content = self.section_band(content_def, content, width, id);
        let mut section = SectionElement::new(def.common.base(), def.data_source, content);

        if def.header
            && let Some(band_def) = def.header_data
        {
            let band = SectionBand::header(band_def.id, band_def.height).with_repeat_header(band_def.repeat_header);
            section = section.with_header(self.section_band(band_def, band, width, id));
        }
        if def.footer
            && let Some(band_def) = def.footer_data
        {
            let band = SectionBand::footer(band_def.id, band_def.height);
            section = section.with_footer(self.section_band(band_def, band, width, id));
        }
        Some(section)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn definition(elements: serde_json::Value) -> ReportDefinition {
        serde_json::from_value(json!({
            "documentProperties": {
                "pageFormat": "A4", "orientation": "portrait",
                "marginLeft": "20", "marginTop": 20, "marginRight": 20, "marginBottom": 20,
                "header": true, "headerSize": 60, "headerDisplay": "not_on_first_page",
                "footer": false, "footerSize": 40
            },
            "parameters": [
                {"id": 1, "name": "items", "type": "array", "children": [
                    {"id": 2, "name": "amount", "type": "number"}
                ]}
            ],
            "styles": [{"id": 7, "bold": true, "fontSize": 16}],
            "docElements": elements,
        }))
        .unwrap()
    }

    #[test]
    fn test_page_sizes() {
        let mut props = DocumentProperties::default();
        assert_eq!(props.page_size(), Size::new(595.0, 842.0));
        props.orientation = Orientation::Landscape;
        assert_eq!(props.page_size(), Size::new(842.0, 595.0));
        props.orientation = Orientation::Portrait;
        props.page_format = PageFormat::Letter;
        assert_eq!(props.page_size(), Size::new(612.0, 792.0));
        props.page_format = PageFormat::UserDefined;
        props.unit = Unit::Inch;
        props.page_width = 4.0;
        props.page_height = 6.0;
        assert_eq!(props.page_size(), Size::new(288.0, 432.0));
    }

    #[test]
    fn test_disabled_bands_take_no_space() {
        let def = definition(json!([]));
        let props = &def.document_properties;
        assert_eq!(props.header_display(), BandDisplay::NotOnFirstPage);
        assert_eq!(props.footer_display(), BandDisplay::Never);
        assert_eq!(props.footer_size(), 0.0);
        assert_eq!(props.content_width(), 555.0);
        assert_eq!(props.content_height(), 842.0 - 60.0 - 20.0 - 20.0);
    }

    #[test]
    fn test_unknown_page_format_is_user_defined() {
        let props: DocumentProperties =
            serde_json::from_value(json!({"pageFormat": "user_defined", "pageWidth": "150", "pageHeight": 200}))
                .unwrap();
        assert_eq!(props.page_format, PageFormat::UserDefined);
        assert_eq!(props.page_size(), Size::new(425.0, 567.0));
    }

    #[test]
    fn test_builds_nested_containers() {
        let def = definition(json!([
            {"elementType": "text", "id": 10, "containerId": "0_content",
             "x": 0, "y": 0, "width": 200, "height": 20, "content": "Hello", "styleId": 7},
            {"elementType": "frame", "id": 11, "containerId": "0_content",
             "x": 0, "y": 40, "width": 300, "height": 100, "linkedContainerId": "frame_a",
             "borderAll": true, "borderWidth": 1},
            {"elementType": "line", "id": 12, "containerId": "frame_a",
             "x": 0, "y": 0, "width": 100, "height": 1, "color": "#ff0000"},
            {"elementType": "section", "id": 13, "containerId": "0_content",
             "x": 0, "y": 160, "width": 555, "height": 30, "dataSource": "${items}",
             "contentData": {"id": 14, "height": 30, "linkedContainerId": "band_b"}},
            {"elementType": "text", "id": 15, "containerId": "band_b",
             "x": 0, "y": 0, "width": 100, "height": 20, "content": "${amount}"},
            {"elementType": "text", "id": 16, "containerId": "0_header",
             "x": 0, "y": 0, "width": 100, "height": 20, "content": "Header"}
        ]));
        let template = def.build(&LayoutConfig::default()).unwrap();
        assert_eq!(template.content.elements().len(), 3);
        assert_eq!(template.header.elements().len(), 1);
        assert!(template.footer.elements().is_empty());

        let Some(Element::Frame(frame)) = template.content.elements().iter().find(|e| e.id() == ElementId(11))
        else {
            panic!("frame missing");
        };
        assert_eq!(frame.container().elements().len(), 1);
        assert!(frame.border.border_all);
    }

    #[test]
    fn test_collects_geometry_errors() {
        let def = definition(json!([
            {"elementType": "text", "id": 20, "containerId": "0_content",
             "x": -5, "y": 0, "width": 100, "height": 20},
            {"elementType": "text", "id": 21, "containerId": "0_content",
             "x": 500, "y": 0, "width": 100, "height": 20},
            {"elementType": "text", "id": 22, "containerId": "0_header",
             "x": 0, "y": 50, "width": 100, "height": 20}
        ]));
        let Err(ReportError::InvalidTemplate(errors)) = def.build(&LayoutConfig::default()) else {
            panic!("expected template errors");
        };
        let ids: Vec<_> = errors.iter().map(|e| e.element_id).collect();
        assert_eq!(ids, vec![ElementId(22), ElementId(20), ElementId(21)]);
        assert!(errors.iter().all(|e| e.field == "position"));
    }

    #[test]
    fn test_detects_container_cycles() {
        let def = definition(json!([
            {"elementType": "frame", "id": 30, "containerId": "0_content",
             "x": 0, "y": 0, "width": 100, "height": 100, "linkedContainerId": "a"},
            {"elementType": "frame", "id": 31, "containerId": "a",
             "x": 0, "y": 0, "width": 50, "height": 50, "linkedContainerId": "a"}
        ]));
        let Err(ReportError::InvalidTemplate(errors)) = def.build(&LayoutConfig::default()) else {
            panic!("expected template errors");
        };
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].element_id, ElementId(31));
        assert_eq!(errors[0].field, "linkedContainerId");
    }

    #[test]
    fn test_invalid_parameters_and_barcodes() {
        let mut def = definition(json!([
            {"elementType": "bar_code", "id": 40, "containerId": "0_content",
             "x": 0, "y": 0, "width": 100, "height": 40, "format": "EAN13", "content": "123"}
        ]));
        def.parameters.push(Parameter::new("items", reportflow_types::ParameterType::String));
        def.parameters.push(Parameter::new("2fast", reportflow_types::ParameterType::String));
        let Err(ReportError::InvalidTemplate(errors)) = def.build(&LayoutConfig::default()) else {
            panic!("expected template errors");
        };
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "name", "format"]);
    }
}
