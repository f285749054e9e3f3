//! Typed document blocks for program windows.
//!
//! Text is split on blank lines and each chunk is classified by shape alone. Nothing is
//! ever interpreted as markup: the renderer only emits plain labels.

const HEADING_MAX: usize = 100;
const LIST_SENTENCE_MAX: usize = 200;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Block {
    Heading(String),
    List(Vec<String>),
    Paragraph(String),
}

/// Short, capitalized, no sentence punctuation and no `Label:` colon. The last chunk
/// only counts when it is also the first.
fn is_heading(chunk: &str, index: usize, total: usize) -> bool {
    chunk.chars().count() < HEADING_MAX
        && !chunk.contains(['.', ',', ':'])
        && chunk.chars().any(char::is_uppercase)
        && (index == 0 || index + 1 < total)
}

/// `Label: ...`, or one short sentence ending in its only full stop.
fn is_list_item(chunk: &str) -> bool {
    let Some(rest) = chunk.strip_prefix(|c: char| c.is_ascii_uppercase()) else {
        return false;
    };
    let labelled = rest
        .find([':', '.'])
        .is_some_and(|i| rest[i..].starts_with(':'));
    let sentence = rest
        .strip_suffix('.')
        .is_some_and(|body| !body.contains('.'))
        && chunk.chars().count() < LIST_SENTENCE_MAX;
    labelled || sentence
}

pub fn parse_blocks(text: &str) -> Vec<Block> {
    let chunks: Vec<&str> = text
        .split("\n\n")
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect();
    let mut blocks = Vec::new();
    let mut i = 0;
    while i < chunks.len() {
        let chunk = chunks[i];
        if is_heading(chunk, i, chunks.len()) {
            blocks.push(Block::Heading(chunk.to_owned()));
            i += 1;
        } else if is_list_item(chunk) {
            let run: Vec<String> = chunks[i..]
                .iter()
                .take_while(|c| is_list_item(c))
                .map(|c| (*c).to_owned())
                .collect();
            i += run.len();
            blocks.push(Block::List(run));
        } else {
            blocks.push(Block::Paragraph(chunk.to_owned()));
            i += 1;
        }
    }
    blocks
}

pub const PORTFOLIO_DOC: &str = "Portfolio Application\n\nWelcome to my digital portfolio!";

pub const PROJECTS_DOC: &str = "Projects Folder\n\n\
    📄 Project_Alpha.exe\n📄 Project_Beta.exe\n📄 Project_Gamma.exe\n📁 Archive";

pub const ABOUT_DOC: &str = "About\n\n\
    System: mem0 OS v3.7.1\n\n\
    Developer: mem0\n\n\
    Status: Active\n\n\
    Location: The Void\n\n\
    Purpose: Digital portfolio and creative workspace";

/// Body text for a program window, by program id.
pub fn document_for(id: &str, name: &str) -> Vec<Block> {
    match id {
        "portfolio" => parse_blocks(PORTFOLIO_DOC),
        "projects" => parse_blocks(PROJECTS_DOC),
        "about" => parse_blocks(ABOUT_DOC),
        _ => vec![
            Block::Heading(name.to_owned()),
            Block::Paragraph("Program content will be loaded here...".to_owned()),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_then_labelled_list() {
        let blocks = parse_blocks(ABOUT_DOC);
        assert_eq!(blocks[0], Block::Heading("About".into()));
        let Block::List(items) = &blocks[1] else {
            panic!("expected a list, got {:?}", blocks[1]);
        };
        assert_eq!(items.len(), 5);
        assert_eq!(items[0], "System: mem0 OS v3.7.1");
        assert_eq!(blocks.len(), 2);
    }

    #[test]
    fn last_chunk_is_never_a_heading_unless_alone() {
        assert_eq!(
            parse_blocks("Intro text, with a comma\n\nClosing Words"),
            vec![
                Block::Paragraph("Intro text, with a comma".into()),
                Block::Paragraph("Closing Words".into()),
            ]
        );
        assert_eq!(parse_blocks("Only Title"), vec![Block::Heading("Only Title".into())]);
    }

    #[test]
    fn lowercase_or_punctuated_chunks_are_not_headings() {
        let blocks = parse_blocks("all lowercase here\n\nTitle, Subtitle\n\nEnd");
        assert_eq!(blocks[0], Block::Paragraph("all lowercase here".into()));
        assert_eq!(blocks[1], Block::Paragraph("Title, Subtitle".into()));
    }

    #[test]
    fn short_sentences_group_into_one_list() {
        let blocks = parse_blocks("Tools\n\nRust is fun.\n\nBevy is an engine.\n\nthen a paragraph");
        assert_eq!(
            blocks,
            vec![
                Block::Heading("Tools".into()),
                Block::List(vec!["Rust is fun.".into(), "Bevy is an engine.".into()]),
                Block::Paragraph("then a paragraph".into()),
            ]
        );
    }

    #[test]
    fn two_sentences_make_a_paragraph() {
        let text = "Heading Here\n\nFirst sentence. Second sentence.";
        assert_eq!(
            parse_blocks(text)[1],
            Block::Paragraph("First sentence. Second sentence.".into())
        );
    }

    #[test]
    fn markup_stays_literal() {
        let text = "Intro, then markup\n\n<b>bold</b> <script>x()</script>";
        assert_eq!(
            parse_blocks(text)[1],
            Block::Paragraph("<b>bold</b> <script>x()</script>".into())
        );
    }

    #[test]
    fn unknown_program_gets_placeholder() {
        let blocks = document_for("contact", "Contact");
        assert_eq!(blocks[0], Block::Heading("Contact".into()));
        assert!(matches!(&blocks[1], Block::Paragraph(p) if p.starts_with("Program content")));
    }
}
