use super::ElementBase;
use crate::fragment::Fragment;
use crate::painting::paint_background;
use crate::LayoutError;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use log::warn;
use reportflow_traits::{is_parameter_name, strip_parameter_name, value_to_string, Canvas, EvaluationContext};
use reportflow_types::{Color, HorizontalAlignment, ParameterType, Rect, Size, VerticalAlignment};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Where the bytes of an image come from once the element is prepared.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    /// Resolved by the canvas itself, e.g. a resource path or url.
    Key(String),
    /// Decoded from a base64 data url.
    Data { key: String, bytes: Vec<u8> },
}

#[derive(Debug, Clone)]
pub struct ImageElement {
    pub base: ElementBase,
    /// A literal key or a `${param}` of type image or string.
    pub source: String,
    /// A `${param}` holding a data url, used when `source` is empty.
    pub content: String,
    /// Static data url embedded in the template.
    pub image: String,
    pub image_filename: String,
    pub horizontal_alignment: HorizontalAlignment,
    pub vertical_alignment: VerticalAlignment,
    pub background_color: Option<Color>,
    pub link: String,

    image_key: Option<String>,
    image_size: Size,
    resolved_link: Option<String>,
}

impl ImageElement {
    pub fn new(base: ElementBase) -> Self {
        Self {
            base,
            source: String::new(),
            content: String::new(),
            image: String::new(),
            image_filename: String::new(),
            horizontal_alignment: HorizontalAlignment::Left,
            vertical_alignment: VerticalAlignment::Top,
            background_color: None,
            link: String::new(),
            image_key: None,
            image_size: Size::zero(),
            resolved_link: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_static_image(mut self, data_url: impl Into<String>, filename: impl Into<String>) -> Self {
        self.image = data_url.into();
        self.image_filename = filename.into();
        self
    }

    pub fn with_alignment(mut self, horizontal: HorizontalAlignment, vertical: VerticalAlignment) -> Self {
        self.horizontal_alignment = horizontal;
        self.vertical_alignment = vertical;
        self
    }

    pub fn image_key(&self) -> Option<&str> {
        self.image_key.as_deref()
    }

    pub(crate) fn set_height(&mut self, height: f32) {
        self.base.height = height;
    }

    fn invalid(&self, field: &'static str, message: impl Into<String>) -> LayoutError {
        LayoutError::InvalidData {
            element_id: self.base.id,
            field,
            message: message.into(),
        }
    }

    fn string_data(&self, ctx: &dyn EvaluationContext, name: &str) -> Option<String> {
        ctx.data(name)
            .map(value_to_string)
            .filter(|value| !value.is_empty())
    }

    /// Resolves the image source: source parameter, literal source, content
    /// parameter, then the static image.
    pub fn resolve(&self, ctx: &dyn EvaluationContext) -> Result<Option<ImageSource>, LayoutError> {
        let source = self.source.trim();
        if !source.is_empty() {
            if !is_parameter_name(source) {
                return Ok(Some(ImageSource::Key(source.to_string())));
            }
            let name = strip_parameter_name(source);
            let parameter = ctx
                .parameter(name)
                .ok_or_else(|| self.invalid("source", format!("parameter '{}' is not defined", name)))?;
            return match parameter.kind {
                ParameterType::String => Ok(self.string_data(ctx, name).map(ImageSource::Key)),
                ParameterType::Image => match self.string_data(ctx, name) {
                    Some(data_url) => self.decode_data_url(&data_url, None).map(Some),
                    None => Ok(None),
                },
                other => Err(self.invalid(
                    "source",
                    format!("parameter '{}' of type {:?} cannot be used as image source", name, other),
                )),
            };
        }

        if is_parameter_name(&self.content) {
            let name = strip_parameter_name(&self.content);
            if let Some(data_url) = self.string_data(ctx, name) {
                return self.decode_data_url(&data_url, None).map(Some);
            }
        }

        if !self.image.is_empty() {
            let key = (!self.image_filename.is_empty()).then_some(self.image_filename.as_str());
            return self.decode_data_url(&self.image, key).map(Some);
        }
        Ok(None)
    }

    fn decode_data_url(&self, data_url: &str, key: Option<&str>) -> Result<ImageSource, LayoutError> {
        let (media_type, payload) = data_url
            .strip_prefix("data:image/")
            .and_then(|rest| rest.split_once(";base64,"))
            .ok_or_else(|| self.invalid("source", "image data is not a base64 data url"))?;
        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| self.invalid("source", format!("invalid base64 image data: {}", e)))?;
        let extension = match media_type {
            "jpeg" | "jpe" | "jfif" => "jpg",
            other => other,
        };
        let key = match key {
            Some(key) => key.to_string(),
            None => {
                let mut hasher = DefaultHasher::new();
                bytes.hash(&mut hasher);
                format!("image_{:016x}.{}", hasher.finish(), extension)
            }
        };
        Ok(ImageSource::Data { key, bytes })
    }

    pub fn prepare(&mut self, ctx: &dyn EvaluationContext, canvas: Option<&mut dyn Canvas>) -> Result<(), LayoutError> {
        self.resolved_link = if self.link.is_empty() {
            None
        } else {
            Some(ctx.fill_parameters(&self.link, self.base.id, "link", None)?)
        };

        let source = self.resolve(ctx)?;
        self.image_key = None;
        self.image_size = Size::zero();

        if let (Some(source), Some(canvas)) = (source, canvas) {
            let (key, data) = match &source {
                ImageSource::Key(key) => (key.as_str(), None),
                ImageSource::Data { key, bytes } => (key.as_str(), Some(bytes.as_slice())),
            };
            match canvas.register_image(key, data) {
                Ok(size) => {
                    self.image_key = Some(key.to_string());
                    self.image_size = size;
                }
                Err(e) => warn!("Image of element {} is skipped: {}", self.base.id, e),
            }
        }
        Ok(())
    }

    pub fn next_fragment(&mut self, offset_y: f32, container_height: f32) -> Result<(Option<Fragment>, bool), LayoutError> {
        if !self.base.place_atomic(offset_y, container_height)? {
            return Ok((None, false));
        }
        let block = ImageBlock {
            rect: Rect::new(self.base.x, offset_y, self.base.width, self.base.height),
            image: self.image_key.clone().map(|key| (key, self.image_size)),
            horizontal_alignment: self.horizontal_alignment,
            vertical_alignment: self.vertical_alignment,
            background_color: self.background_color,
            link: self.resolved_link.clone(),
        };
        Ok((Some(Fragment::Image(block)), true))
    }

    pub fn cleanup(&mut self) {
        self.image_key = None;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageBlock {
    pub rect: Rect,
    /// Registered key and intrinsic size.
    pub image: Option<(String, Size)>,
    pub horizontal_alignment: HorizontalAlignment,
    pub vertical_alignment: VerticalAlignment,
    pub background_color: Option<Color>,
    pub link: Option<String>,
}

impl ImageBlock {
    /// Where the image is drawn inside `bounds`, keeping its aspect ratio.
    pub fn image_rect(&self, bounds: Rect, size: Size) -> Rect {
        let display = size.fit_into(Size::new(bounds.width, bounds.height));
        let offset_x = match self.horizontal_alignment {
            HorizontalAlignment::Center => (bounds.width - display.width) / 2.0,
            HorizontalAlignment::Right => bounds.width - display.width,
            _ => 0.0,
        };
        let offset_y = match self.vertical_alignment {
            VerticalAlignment::Top => 0.0,
            VerticalAlignment::Middle => (bounds.height - display.height) / 2.0,
            VerticalAlignment::Bottom => bounds.height - display.height,
        };
        Rect::new(bounds.x + offset_x, bounds.y + offset_y, display.width, display.height)
    }

    pub fn render(&self, offset_x: f32, offset_y: f32, canvas: &mut dyn Canvas) {
        let bounds = Rect::new(offset_x + self.rect.x, offset_y + self.rect.y, self.rect.width, self.rect.height);
        if let Some(color) = self.background_color {
            paint_background(canvas, bounds, color);
        }
        let target = match &self.image {
            Some((key, size)) => {
                let target = self.image_rect(bounds, *size);
                canvas.draw_image(key, target);
                target
            }
            None => bounds,
        };
        if let Some(link) = &self.link {
            canvas.add_link(target, link);
        }
    }
}
