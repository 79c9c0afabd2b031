use crate::models::skeleton::{ClassRecord, FieldSource, FunctionRecord, MethodRecord};
use std::fmt::Write;

/// Render a class skeleton: header line, class-body fields, `__init__` with
/// its instance variables, then every other method elided to its signature,
/// first docstring line, and `...`. Line numbers ride in `# L<n>` comments.
pub fn render_class(class: &ClassRecord) -> String {
    let mut out = String::new();
    let bases = if class.bases.is_empty() {
        String::new()
    } else {
        format!("({})", class.bases.join(", "))
    };
    for decorator in &class.decorators {
        let _ = writeln!(out, "@{decorator}");
    }
    let _ = writeln!(out, "class {}{}:  # L{}", class.name, bases, class.line);
    if !class.docstring.is_empty() {
        let _ = writeln!(out, "    \"\"\"{}\"\"\"", class.docstring);
    }
    for field in class
        .fields
        .iter()
        .filter(|f| f.source == FieldSource::ClassBody)
    {
        let mut line = format!("    {}", field.name);
        if let Some(annotation) = &field.annotation {
            line.push_str(": ");
            line.push_str(annotation);
        }
        if let Some(default) = &field.default {
            line.push_str(" = ");
            line.push_str(default);
        }
        let _ = writeln!(out, "{line}");
    }

    for method in &class.methods {
        render_method(&mut out, method, class);
    }
    out
}

fn render_method(out: &mut String, method: &MethodRecord, class: &ClassRecord) {
    for decorator in &method.decorators {
        let _ = writeln!(out, "    @{decorator}");
    }
    let _ = writeln!(out, "    {}:  # L{}", method.signature(), method.line);
    if method.name == "__init__" {
        // Instance variables sit right under the __init__ signature.
        for field in class
            .fields
            .iter()
            .filter(|f| f.source == FieldSource::InitAssignment)
        {
            let default = field.default.as_deref().unwrap_or("...");
            let _ = writeln!(out, "        self.{} = {}", field.name, default);
        }
        return;
    }
    if !method.docstring.is_empty() {
        let _ = writeln!(out, "        \"\"\"{}\"\"\"", method.docstring);
    }
    let _ = writeln!(out, "        ...");
}

/// One-line skeleton of a module-level function.
pub fn render_function(function: &FunctionRecord) -> String {
    let mut out = String::new();
    for decorator in &function.decorators {
        let _ = writeln!(out, "@{decorator}");
    }
    let _ = writeln!(out, "{}:  # L{}", function.signature(), function.line);
    if !function.docstring.is_empty() {
        let _ = writeln!(out, "    \"\"\"{}\"\"\"", function.docstring);
    }
    let _ = writeln!(out, "    ...");
    out
}
