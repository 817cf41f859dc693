//! razorize — convert ASP.NET Web Forms pages into Razor views.
//!
//! The pipeline runs in five stages per input file:
//!
//! 1. **Normalize** — drop `<!-- -->` comments and `<%@ %>` page directives
//! 2. **Map** — parse the markup, rename `asp:*` controls to HTML elements,
//!    drop `<form runat="server">` wrappers and strip `runat` attributes
//! 3. **Extract** — pull public fields and event handlers out of the
//!    `.aspx.cs` code-behind file, if there is one
//! 4. **Merge** — serialize the tree and append an `@functions { }` block
//! 5. **Convert** — derive paths, write `<Name>.cshtml`, keep going on failure

pub mod codebehind;
pub mod convert;
pub mod error;
pub mod mapper;
pub mod markup;
pub mod merge;
pub mod normalize;

pub use codebehind::{
    extract_from_source, extract_logic, ExtractedLogic, HandlerStubs, PropertyDeclaration,
};
pub use convert::{companion_path, output_path, ConversionResult, ConvertOptions, Converter};
pub use error::{ConvertError, ConvertResult};
pub use mapper::{apply_rules, map_controls, ControlTagRule, Mapped, CONTROL_TAG_RULES};
pub use markup::{Document, Element, Node, ParseWarning, WarningKind};
pub use merge::{merge, BlockStyle};
pub use normalize::normalize;
