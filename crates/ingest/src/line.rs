/// Splits one raw line into fields at `delimiter`, honoring spreadsheet-style
/// quoting: a double-quoted field may contain the delimiter, `""` inside
/// quotes is one literal quote, and a quote anywhere but the start of a field
/// is ordinary content. Fields are returned verbatim, untrimmed; an
/// unterminated quote is treated as closed at end of line. Single pass, no
/// backtracking.
pub fn split_line(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
        } else if c == '"' && field.is_empty() {
            in_quotes = true;
        } else if c == delimiter {
            fields.push(std::mem::take(&mut field));
        } else {
            field.push(c);
        }
    }
    fields.push(field);
    fields
}
