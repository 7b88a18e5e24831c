//! Block kinds — the closed set of UI components LiquidCode can describe
//!
//! Every kind has a 2–3 letter type code. The ten core kinds also have a
//! single-digit index (`0`–`9`) accepted as shorthand by the parser.
//! Adding a kind means adding one variant and one row to each table below;
//! the compiler flags every match that needs updating.

use serde::{Deserialize, Serialize};

/// Component type of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockKind {
    // Core kinds (indexed 0-9)
    Container,
    Kpi,
    Bar,
    Line,
    Pie,
    Table,
    Form,
    List,
    Card,
    Modal,

    // Charts
    Area,
    Scatter,
    Heatmap,
    Gauge,

    // Layout
    Grid,
    Stack,
    Split,
    Tabs,
    Accordion,

    // Overlays
    Drawer,
    Sheet,
    Popover,
    Tooltip,

    // Display
    Text,
    Heading,
    Image,
    Icon,
    Badge,
    Tag,
    Avatar,
    Alert,
    Toast,
    Progress,
    Timeline,
    Kanban,
    Calendar,
    Empty,

    // Inputs
    Button,
    Input,
    Textarea,
    Select,
    Radio,
    Checkbox,
    Switch,
    DatePicker,
    Slider,
    Upload,
    Option,
    Stepper,
    Step,
}

impl BlockKind {
    /// All kinds, in declaration order
    pub const ALL: &'static [BlockKind] = &[
        BlockKind::Container,
        BlockKind::Kpi,
        BlockKind::Bar,
        BlockKind::Line,
        BlockKind::Pie,
        BlockKind::Table,
        BlockKind::Form,
        BlockKind::List,
        BlockKind::Card,
        BlockKind::Modal,
        BlockKind::Area,
        BlockKind::Scatter,
        BlockKind::Heatmap,
        BlockKind::Gauge,
        BlockKind::Grid,
        BlockKind::Stack,
        BlockKind::Split,
        BlockKind::Tabs,
        BlockKind::Accordion,
        BlockKind::Drawer,
        BlockKind::Sheet,
        BlockKind::Popover,
        BlockKind::Tooltip,
        BlockKind::Text,
        BlockKind::Heading,
        BlockKind::Image,
        BlockKind::Icon,
        BlockKind::Badge,
        BlockKind::Tag,
        BlockKind::Avatar,
        BlockKind::Alert,
        BlockKind::Toast,
        BlockKind::Progress,
        BlockKind::Timeline,
        BlockKind::Kanban,
        BlockKind::Calendar,
        BlockKind::Empty,
        BlockKind::Button,
        BlockKind::Input,
        BlockKind::Textarea,
        BlockKind::Select,
        BlockKind::Radio,
        BlockKind::Checkbox,
        BlockKind::Switch,
        BlockKind::DatePicker,
        BlockKind::Slider,
        BlockKind::Upload,
        BlockKind::Option,
        BlockKind::Stepper,
        BlockKind::Step,
    ];

    /// DSL type code
    pub fn code(self) -> &'static str {
        match self {
            BlockKind::Container => "Cn",
            BlockKind::Kpi => "Kp",
            BlockKind::Bar => "Br",
            BlockKind::Line => "Ln",
            BlockKind::Pie => "Pi",
            BlockKind::Table => "Tb",
            BlockKind::Form => "Fm",
            BlockKind::List => "Ls",
            BlockKind::Card => "Cd",
            BlockKind::Modal => "Md",
            BlockKind::Area => "Ar",
            BlockKind::Scatter => "Sc",
            BlockKind::Heatmap => "Hm",
            BlockKind::Gauge => "Gau",
            BlockKind::Grid => "Gd",
            BlockKind::Stack => "Sk",
            BlockKind::Split => "Sl",
            BlockKind::Tabs => "Ts",
            BlockKind::Accordion => "Acc",
            BlockKind::Drawer => "Dw",
            BlockKind::Sheet => "Sh",
            BlockKind::Popover => "Po",
            BlockKind::Tooltip => "Tt",
            BlockKind::Text => "Tx",
            BlockKind::Heading => "Hd",
            BlockKind::Image => "Im",
            BlockKind::Icon => "Ic",
            BlockKind::Badge => "Bd",
            BlockKind::Tag => "Tg",
            BlockKind::Avatar => "Av",
            BlockKind::Alert => "Al",
            BlockKind::Toast => "To",
            BlockKind::Progress => "Pg",
            BlockKind::Timeline => "Tl",
            BlockKind::Kanban => "Kb",
            BlockKind::Calendar => "Ca",
            BlockKind::Empty => "Em",
            BlockKind::Button => "Bt",
            BlockKind::Input => "In",
            BlockKind::Textarea => "Ta",
            BlockKind::Select => "Se",
            BlockKind::Radio => "Rd",
            BlockKind::Checkbox => "Ck",
            BlockKind::Switch => "Sw",
            BlockKind::DatePicker => "Dp",
            BlockKind::Slider => "Sd",
            BlockKind::Upload => "Up",
            BlockKind::Option => "Op",
            BlockKind::Stepper => "Stp",
            BlockKind::Step => "Ste",
        }
    }

    /// Single-digit shorthand, for the ten core kinds
    pub fn index(self) -> Option<u8> {
        match self {
            BlockKind::Container => Some(0),
            BlockKind::Kpi => Some(1),
            BlockKind::Bar => Some(2),
            BlockKind::Line => Some(3),
            BlockKind::Pie => Some(4),
            BlockKind::Table => Some(5),
            BlockKind::Form => Some(6),
            BlockKind::List => Some(7),
            BlockKind::Card => Some(8),
            BlockKind::Modal => Some(9),
            _ => None,
        }
    }

    /// Schema name (the `type` field of a block)
    pub fn name(self) -> &'static str {
        match self {
            BlockKind::Container => "container",
            BlockKind::Kpi => "kpi",
            BlockKind::Bar => "bar",
            BlockKind::Line => "line",
            BlockKind::Pie => "pie",
            BlockKind::Table => "table",
            BlockKind::Form => "form",
            BlockKind::List => "list",
            BlockKind::Card => "card",
            BlockKind::Modal => "modal",
            BlockKind::Area => "area",
            BlockKind::Scatter => "scatter",
            BlockKind::Heatmap => "heatmap",
            BlockKind::Gauge => "gauge",
            BlockKind::Grid => "grid",
            BlockKind::Stack => "stack",
            BlockKind::Split => "split",
            BlockKind::Tabs => "tabs",
            BlockKind::Accordion => "accordion",
            BlockKind::Drawer => "drawer",
            BlockKind::Sheet => "sheet",
            BlockKind::Popover => "popover",
            BlockKind::Tooltip => "tooltip",
            BlockKind::Text => "text",
            BlockKind::Heading => "heading",
            BlockKind::Image => "image",
            BlockKind::Icon => "icon",
            BlockKind::Badge => "badge",
            BlockKind::Tag => "tag",
            BlockKind::Avatar => "avatar",
            BlockKind::Alert => "alert",
            BlockKind::Toast => "toast",
            BlockKind::Progress => "progress",
            BlockKind::Timeline => "timeline",
            BlockKind::Kanban => "kanban",
            BlockKind::Calendar => "calendar",
            BlockKind::Empty => "empty",
            BlockKind::Button => "button",
            BlockKind::Input => "input",
            BlockKind::Textarea => "textarea",
            BlockKind::Select => "select",
            BlockKind::Radio => "radio",
            BlockKind::Checkbox => "checkbox",
            BlockKind::Switch => "switch",
            BlockKind::DatePicker => "date-picker",
            BlockKind::Slider => "slider",
            BlockKind::Upload => "upload",
            BlockKind::Option => "option",
            BlockKind::Stepper => "stepper",
            BlockKind::Step => "step",
        }
    }

    pub fn from_code(code: &str) -> Option<BlockKind> {
        Self::ALL.iter().copied().find(|k| k.code() == code)
    }

    pub fn from_index(index: u8) -> Option<BlockKind> {
        Self::ALL.iter().copied().find(|k| k.index() == Some(index))
    }

    /// True for words shaped like a type code (`Kp`, `Gau`) whether or not
    /// the table knows them.
    pub fn looks_like_code(word: &str) -> bool {
        let mut chars = word.chars();
        let first_upper = chars.next().is_some_and(|c| c.is_ascii_uppercase());
        let rest: Vec<char> = chars.collect();
        first_upper && (1..=2).contains(&rest.len()) && rest.iter().all(|c| c.is_ascii_lowercase())
    }

    /// Surfaces that usually live on a layer above the base view
    pub fn is_overlay(self) -> bool {
        matches!(
            self,
            BlockKind::Modal | BlockKind::Drawer | BlockKind::Sheet | BlockKind::Popover
        )
    }
}

impl std::fmt::Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
