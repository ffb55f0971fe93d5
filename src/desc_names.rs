/// Turns a type descriptor (`[Ljava/lang/String;`) into its source form
/// (`java.lang.String[]`).
pub fn pretty_desc(desc: &str) -> String {
    let dim = desc.chars().take_while(|c| *c == '[').count();
    let name = &desc[dim..];
    let mut output = String::new();

    if let Some(class_name) = name.strip_prefix('L') {
        let class_name = class_name.strip_suffix(';').unwrap_or(class_name);
        output.push_str(&class_name.replace('/', "."));
    } else {
        output.push_str(match name.as_bytes().first() {
            Some(b'B') => "byte",
            Some(b'C') => "char",
            Some(b'D') => "double",
            Some(b'F') => "float",
            Some(b'I') => "int",
            Some(b'J') => "long",
            Some(b'S') => "short",
            Some(b'Z') => "boolean",
            Some(b'V') => "void",
            _ => name,
        });
    }

    if dim > 0 {
        output.push_str(&"[]".repeat(dim));
    }
    output
}
