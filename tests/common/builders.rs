use once_cell::sync::Lazy;

use form_filler::cli::config::{AppConfig, AppContext};
use form_filler::extract::descriptor::{FieldDescriptor, Rect, SelectOption};
use form_filler::lexicon::Lexicon;
use form_filler::trace::EventLog;

static LEXICON: Lazy<Lexicon> = Lazy::new(|| Lexicon::builtin().expect("built-in lexicon compiles"));

pub fn lexicon() -> Lexicon {
    LEXICON.clone()
}

pub fn context() -> AppContext {
    context_with(|_| {})
}

pub fn context_with(configure: impl FnOnce(&mut AppConfig)) -> AppContext {
    let mut config = AppConfig::default();
    configure(&mut config);
    AppContext::with_lexicon(lexicon(), &config, EventLog::disabled())
}

/// Chainable descriptor builder. Defaults to a visible, enabled element
/// located by `tag[name="..."]`.
pub struct Field(FieldDescriptor);

impl Field {
    fn base(tag: &str, input_type: &str, name: &str) -> Self {
        Field(FieldDescriptor {
            tag: tag.to_string(),
            input_type: input_type.to_string(),
            name: name.to_string(),
            visible: true,
            selector: format!("{}[name=\"{}\"]", tag, name),
            ..Default::default()
        })
    }

    pub fn input(input_type: &str, name: &str) -> Self {
        Self::base("input", input_type, name)
    }

    pub fn text(name: &str) -> Self {
        Self::input("text", name)
    }

    pub fn textarea(name: &str) -> Self {
        Self::base("textarea", "", name)
    }

    /// Select with a leading placeholder option.
    pub fn select(name: &str, options: &[(&str, &str)]) -> Self {
        let mut field = Self::base("select", "", name);
        field.0.options.push(SelectOption::new("選択してください", "", false));
        field
            .0
            .options
            .extend(options.iter().map(|(text, value)| SelectOption::new(text, value, false)));
        field
    }

    pub fn radio(name: &str, value: &str, label: &str) -> Self {
        let mut field = Self::input("radio", name);
        field.0.value = value.to_string();
        field.0.label_text = label.to_string();
        field.0.selector = format!("input[name=\"{}\"][value=\"{}\"]", name, value);
        field
    }

    pub fn checkbox(name: &str, label: &str) -> Self {
        let mut field = Self::input("checkbox", name);
        field.0.label_text = label.to_string();
        field
    }

    pub fn id(mut self, id: &str) -> Self {
        self.0.id = id.to_string();
        self.0.selector = format!("#{}", id);
        self
    }

    pub fn label(mut self, label: &str) -> Self {
        self.0.label_text = label.to_string();
        self
    }

    pub fn placeholder(mut self, placeholder: &str) -> Self {
        self.0.placeholder = placeholder.to_string();
        self
    }

    pub fn aria(mut self, aria_label: &str) -> Self {
        self.0.aria_label = aria_label.to_string();
        self
    }

    pub fn class(mut self, class: &str) -> Self {
        self.0.class = class.to_string();
        self
    }

    pub fn autocomplete(mut self, autocomplete: &str) -> Self {
        self.0.autocomplete = autocomplete.to_string();
        self
    }

    pub fn context(mut self, context: &str) -> Self {
        self.0.context_text = context.to_string();
        self
    }

    pub fn required(mut self) -> Self {
        self.0.required = true;
        self
    }

    pub fn checked(mut self) -> Self {
        self.0.checked = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.0.disabled = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.0.visible = false;
        self
    }

    pub fn rect(mut self, x: f64, y: f64, w: f64, h: f64) -> Self {
        self.0.rect = Some(Rect { x, y, w, h });
        self
    }

    pub fn frame(mut self, index: usize) -> Self {
        self.0.frame_index = index;
        self
    }

    pub fn build(self) -> FieldDescriptor {
        self.0
    }
}

/// Assign document order to a list of built fields.
pub fn form(fields: Vec<Field>) -> Vec<FieldDescriptor> {
    fields
        .into_iter()
        .enumerate()
        .map(|(order, field)| {
            let mut d = field.build();
            d.order = order;
            d
        })
        .collect()
}

/// `(text, value)` pairs for every prefecture, in the usual order.
pub fn prefecture_options() -> Vec<(&'static str, &'static str)> {
    vec![
        ("北海道", "hokkaido"),
        ("青森県", "aomori"),
        ("岩手県", "iwate"),
        ("宮城県", "miyagi"),
        ("秋田県", "akita"),
        ("山形県", "yamagata"),
        ("福島県", "fukushima"),
        ("茨城県", "ibaraki"),
        ("栃木県", "tochigi"),
        ("群馬県", "gunma"),
        ("埼玉県", "saitama"),
        ("千葉県", "chiba"),
        ("東京都", "tokyo"),
        ("神奈川県", "kanagawa"),
        ("新潟県", "niigata"),
        ("富山県", "toyama"),
        ("石川県", "ishikawa"),
        ("福井県", "fukui"),
        ("山梨県", "yamanashi"),
        ("長野県", "nagano"),
        ("岐阜県", "gifu"),
        ("静岡県", "shizuoka"),
        ("愛知県", "aichi"),
        ("京都府", "kyoto"),
        ("大阪府", "osaka"),
    ]
}
