//! Presentation-only button descriptor.
//!
//! Holds no state. Hosts render [`Button::class_names`] onto whatever element they use.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Variant {
    #[default]
    Primary,
    Secondary,
    Ghost,
    Custom(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Size {
    Sm,
    #[default]
    Md,
    Lg,
    Custom(String),
}

impl Variant {
    fn as_str(&self) -> &str {
        match self {
            Variant::Primary => "primary",
            Variant::Secondary => "secondary",
            Variant::Ghost => "ghost",
            Variant::Custom(name) => name,
        }
    }
}

impl Size {
    fn as_str(&self) -> &str {
        match self {
            Size::Sm => "sm",
            Size::Md => "md",
            Size::Lg => "lg",
            Size::Custom(name) => name,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub variant: Variant,
    pub size: Size,
    pub full_width: bool,
    pub class_name: String,
}

impl Button {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    pub fn variant(mut self, variant: Variant) -> Self {
        self.variant = variant;
        self
    }

    pub fn size(mut self, size: Size) -> Self {
        self.size = size;
        self
    }

    pub fn full_width(mut self, full_width: bool) -> Self {
        self.full_width = full_width;
        self
    }

    pub fn class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = class_name.into();
        self
    }

    /// Space separated class list, empty entries dropped.
    pub fn class_names(&self) -> String {
        let variant = format!("btn--{}", self.variant.as_str());
        let size = format!("btn--{}", self.size.as_str());
        let full_width = if self.full_width { "btn--full-width" } else { "" };

        ["btn", &variant, &size, full_width, self.class_name.as_str()]
            .into_iter()
            .filter(|class| !class.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
