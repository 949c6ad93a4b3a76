//! Document assembly: wrap the combined body in a minimal page shell.
//!
//! The shell carries everything the renderer needs in one string: charset,
//! escaped title, the print stylesheet, and the body. The `@page` rule is
//! derived from the configured paper size and margin and always emitted,
//! even when the caller replaces the stylesheet, so pagination geometry is
//! a config concern rather than a CSS-authoring concern.

use crate::config::ConversionConfig;
use crate::pipeline::tree::escape_html;

/// Built-in print-oriented stylesheet.
///
/// `page-break-after` on the fragment separator is what turns each source
/// document into its own page run; `-webkit-print-color-adjust` keeps code
/// block backgrounds visible in print output.
const DEFAULT_STYLESHEET: &str = "\
  body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, 'Helvetica Neue', Arial, sans-serif; line-height: 1.5; -webkit-print-color-adjust: exact; }
  img { max-width: 100%; height: auto; }
  pre { background: #f6f8fa; padding: 12px; overflow-x: auto; white-space: pre-wrap; }
  code { background: #f3f3f3; padding: 2px 4px; border-radius: 4px; font-size: 0.9em; }
  pre > code { background: none; padding: 0; }
  a { color: #0366d6; text-decoration: none; }
  blockquote { border-left: 4px solid #dfe2e5; margin-left: 0; padding-left: 16px; color: #6a737d; }
  table { border-collapse: collapse; }
  th, td { border: 1px solid #dfe2e5; padding: 6px 13px; }
  .page-break { page-break-after: always; }
  .image-error { display: block; color: #b31d28; font-size: 0.85em; }
";

/// Assemble the final self-contained HTML document.
pub fn assemble(body: &str, title: &str, config: &ConversionConfig) -> String {
    let stylesheet = config.stylesheet.as_deref().unwrap_or(DEFAULT_STYLESHEET);
    let page_rule = format!(
        "@page {{ size: {}; margin: {}mm; }}",
        config.paper.css_keyword(),
        config.margin_mm
    );

    format!(
        "<!doctype html>\n\
         <html>\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width,initial-scale=1\">\n\
         <title>{}</title>\n\
         <style>\n{}\n{}\n</style>\n\
         </head>\n\
         <body>\n\
         {}\n\
         </body>\n\
         </html>\n",
        escape_html(title),
        page_rule,
        stylesheet,
        body
    )
}
