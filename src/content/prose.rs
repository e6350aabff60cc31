//! Prose chapter splitting and joining.
//!
//! Prose is generated as one document with chapters separated by a delimiter
//! line, and stored as one file per chapter.

/// Line separating chapters in generated prose
pub const CHAPTER_DELIMITER: &str = "=== CHAPTER BREAK ===";

/// Split generated prose into trimmed, non-empty chapters.
pub fn split_chapters(text: &str) -> Vec<String> {
    let mut chapters = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        if line.trim() == CHAPTER_DELIMITER {
            push_chapter(&mut chapters, &current);
            current.clear();
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }
    push_chapter(&mut chapters, &current);

    chapters
}

fn push_chapter(chapters: &mut Vec<String>, text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        chapters.push(trimmed.to_string());
    }
}

/// Join chapters back into a single delimited document.
pub fn join_chapters(chapters: &[String]) -> String {
    chapters.join(&format!("\n\n{}\n\n", CHAPTER_DELIMITER))
}

/// File name for a 1-based chapter number
pub fn chapter_file_name(number: usize) -> String {
    format!("chapter-{:02}.md", number)
}
