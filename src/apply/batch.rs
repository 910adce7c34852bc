//! Split a script into batches on `GO` separator lines

/// A batch of a script with the 1-based script line it starts on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Batch<'a> {
    pub content: &'a str,
    pub start_line: usize,
}

impl Batch<'_> {
    /// Translate a 1-based line within this batch into a script line.
    pub fn script_line(&self, batch_line: usize) -> usize {
        self.start_line + batch_line.max(1) - 1
    }
}

fn is_separator(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.eq_ignore_ascii_case("go") || trimmed.eq_ignore_ascii_case("go;")
}

/// Split `content` on lines consisting only of `GO` (any case, optional `;`).
///
/// Batches holding nothing but whitespace are dropped.
pub fn split_batches(content: &str) -> Vec<Batch<'_>> {
    let mut batches = Vec::new();
    let mut current_pos = 0;
    let mut batch_start = 0;
    let mut current_line = 1;
    let mut batch_start_line = 1;

    for line in content.lines() {
        let line_end = current_pos + line.len();
        let next_pos = if content[line_end..].starts_with("\r\n") {
            line_end + 2
        } else if content[line_end..].starts_with('\n') {
            line_end + 1
        } else {
            line_end
        };

        if is_separator(line) {
            push_batch(&mut batches, &content[batch_start..current_pos], batch_start_line);
            batch_start = next_pos;
            batch_start_line = current_line + 1;
        }

        current_pos = next_pos;
        current_line += 1;
    }

    if batch_start < content.len() {
        push_batch(&mut batches, &content[batch_start..], batch_start_line);
    }

    batches
}

fn push_batch<'a>(batches: &mut Vec<Batch<'a>>, content: &'a str, start_line: usize) {
    if !content.trim().is_empty() {
        batches.push(Batch {
            content,
            start_line,
        });
    }
}
