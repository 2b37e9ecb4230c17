use crate::element::{ElementBase, ImageElement, TextElement};
use reportflow_traits::{is_parameter_name, strip_parameter_name, EvaluationContext};
use reportflow_types::{Color, ElementId, Parameter, ParameterType, TextStyle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandKind {
    Header,
    Content,
    Footer,
}

/// How the cells of a column are built.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ColumnKind {
    Text,
    Image,
    /// One cell per entry of the array parameter.
    SimpleArray(Parameter),
}

/// Cell template of one table column within a band.
#[derive(Debug, Clone)]
pub struct TableColumn {
    pub id: ElementId,
    pub width: f32,
    pub content: String,
    pub eval: bool,
    pub pattern: String,
    pub link: String,
    pub style: TextStyle,
    pub cs_condition: String,
    pub conditional_style: Option<TextStyle>,
    /// Only evaluated on header columns; a false result removes the column.
    pub print_if: String,
    /// Decided by the first row built from the column.
    pub(crate) kind: Option<ColumnKind>,
}

impl TableColumn {
    pub fn new(id: ElementId, width: f32, content: impl Into<String>) -> Self {
        Self {
            id,
            width,
            content: content.into(),
            eval: false,
            pattern: String::new(),
            link: String::new(),
            style: TextStyle::default(),
            cs_condition: String::new(),
            conditional_style: None,
            print_if: String::new(),
            kind: None,
        }
    }

    pub fn with_style(mut self, style: TextStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_eval(mut self, eval: bool) -> Self {
        self.eval = eval;
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = link.into();
        self
    }

    pub fn with_conditional_style(mut self, condition: impl Into<String>, style: TextStyle) -> Self {
        self.cs_condition = condition.into();
        self.conditional_style = Some(style);
        self
    }

    pub fn with_print_if(mut self, print_if: impl Into<String>) -> Self {
        self.print_if = print_if.into();
        self
    }

    pub(crate) fn decide_kind(&self, ctx: &dyn EvaluationContext) -> ColumnKind {
        if !is_parameter_name(&self.content) {
            return ColumnKind::Text;
        }
        match ctx.parameter(strip_parameter_name(&self.content)) {
            Some(p) if p.kind == ParameterType::Image => ColumnKind::Image,
            Some(p) if p.kind == ParameterType::SimpleArray && !self.eval => ColumnKind::SimpleArray(p.clone()),
            _ => ColumnKind::Text,
        }
    }

    pub(crate) fn text_cell(&self, x: f32, height: f32, content: Option<String>) -> TextElement {
        let mut cell = TextElement::new(
            ElementBase::new(self.id, x, 0.0, self.width, height),
            content.unwrap_or_else(|| self.content.clone()),
        )
        .with_style(self.style.clone())
        .with_eval(self.eval)
        .with_pattern(self.pattern.clone())
        .with_link(self.link.clone());
        if let Some(style) = &self.conditional_style {
            cell = cell.with_conditional_style(self.cs_condition.clone(), style.clone());
        }
        cell.in_table = true;
        cell
    }

    pub(crate) fn image_cell(&self, x: f32, height: f32) -> ImageElement {
        ImageElement::new(ElementBase::new(self.id, x, 0.0, self.width, height))
            .with_source(self.content.clone())
            .with_alignment(self.style.horizontal_alignment, self.style.vertical_alignment)
    }
}

/// A header, content or footer band of a table.
#[derive(Debug, Clone)]
pub struct TableBand {
    pub id: ElementId,
    pub kind: BandKind,
    pub height: f32,
    pub repeat_header: bool,
    pub background_color: Option<Color>,
    /// Background of every second content row.
    pub alternate_background_color: Option<Color>,
    pub columns: Vec<TableColumn>,
    pub group_expression: String,
    pub print_if: String,
    /// Set for content bands declared before the first band without group
    /// expression; their rows print when the group starts, the others when
    /// it ends.
    pub(crate) before_group: bool,
}

impl TableBand {
    fn new(id: ElementId, kind: BandKind, height: f32, columns: Vec<TableColumn>) -> Self {
        Self {
            id,
            kind,
            height,
            repeat_header: false,
            background_color: None,
            alternate_background_color: None,
            columns,
            group_expression: String::new(),
            print_if: String::new(),
            before_group: false,
        }
    }

    pub fn header(id: ElementId, height: f32, columns: Vec<TableColumn>) -> Self {
        Self::new(id, BandKind::Header, height, columns)
    }

    pub fn content(id: ElementId, height: f32, columns: Vec<TableColumn>) -> Self {
        Self::new(id, BandKind::Content, height, columns)
    }

    pub fn footer(id: ElementId, height: f32, columns: Vec<TableColumn>) -> Self {
        Self::new(id, BandKind::Footer, height, columns)
    }

    pub fn with_repeat_header(mut self, repeat: bool) -> Self {
        self.repeat_header = repeat;
        self
    }

    pub fn with_background(mut self, color: Option<Color>) -> Self {
        self.background_color = color;
        self
    }

    pub fn with_alternate_background(mut self, color: Option<Color>) -> Self {
        self.alternate_background_color = color;
        self
    }

    pub fn with_group_expression(mut self, expr: impl Into<String>) -> Self {
        self.group_expression = expr.into();
        self
    }

    pub fn with_print_if(mut self, print_if: impl Into<String>) -> Self {
        self.print_if = print_if.into();
        self
    }

    pub fn has_group(&self) -> bool {
        !self.group_expression.is_empty()
    }

    pub fn is_before_group(&self) -> bool {
        self.before_group
    }

    /// Background for the row with the given data index. Header and footer
    /// rows have no index and always use the plain background.
    pub(crate) fn row_background(&self, row_index: Option<usize>) -> Option<Color> {
        match row_index {
            Some(index) if index % 2 == 1 && self.kind == BandKind::Content => {
                self.alternate_background_color.or(self.background_color)
            }
            _ => self.background_color,
        }
    }
}
