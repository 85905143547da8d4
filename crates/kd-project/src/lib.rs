mod catalog;
mod colors;
mod fonts;
mod host;
mod includes;
mod manifest;
mod paths;
mod project;
mod reference;
mod template;

pub use catalog::{
    label_id, label_key, load_language_catalogs, next_free_label_id, CatalogKey, LabelCatalog,
    LabelCatalogs,
};
pub use colors::{find_color, load_colors, ColorEntry, DEFAULT_COLORS_FILE};
pub use fonts::{collect_font_refs, load_font_names, load_fonts, FontEntry, FontReference};
pub use host::{default_skin_font_file, HostApp, DEFAULT_SKIN};
pub use includes::{IncludeCycle, IncludeEntry, IncludeKind, IncludeTable};
pub use manifest::{AddonImport, Manifest, MANIFEST_FILE, PYTHON_API_ADDON};
pub use paths::{FONT_FILE, INCLUDES_FILE, SHORTCUTS_INCLUDES_FILE};
pub use project::{NodeRef, Project, ProjectKind, ReloadOutcome};
pub use reference::{HelpEntry, ReferenceData, WindowInfo, WINDOW_ID_BASE};
pub use template::{SchemaTemplate, TagRule, ValueType};
