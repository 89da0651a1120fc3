use crate::generator::WordContent;

const GREEN: &str = "186433";
const RED: &str = "B91C1C";
const BLACK: &str = "000000";

/// Text sizes used on the slides
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSize {
    Large,
    Medium,
    Normal,
}

impl TextSize {
    /// Size in hundredths of a point, as OOXML expects
    pub fn hundredths(self) -> u32 {
        match self {
            TextSize::Large => 4400,
            TextSize::Medium => 3200,
            TextSize::Normal => 2400,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLine {
    pub text: String,
    pub size: TextSize,
    pub bold: bool,
    pub color: &'static str,
}

impl TextLine {
    fn new(text: impl Into<String>, size: TextSize, color: &'static str) -> Self {
        Self {
            text: text.into(),
            size,
            bold: false,
            color,
        }
    }

    fn bold(mut self) -> Self {
        self.bold = true;
        self
    }
}

/// One slide: a title line and body lines underneath
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slide {
    pub title: TextLine,
    pub body: Vec<TextLine>,
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn section(heading: &str, lines: Vec<TextLine>) -> Slide {
    Slide {
        title: TextLine::new(heading, TextSize::Large, BLACK),
        body: lines,
    }
}

/// Lay out the slides for a word. Origin, synonym and antonym slides are
/// skipped when there is nothing to show.
pub fn plan_slides(content: &WordContent) -> Vec<Slide> {
    let mut slides = vec![
        Slide {
            title: TextLine::new(format!("Word of the Week: {}", content.word), TextSize::Large, GREEN).bold(),
            body: vec![TextLine::new("Spelling Focus", TextSize::Medium, GREEN)],
        },
        section(
            "Definition",
            vec![TextLine::new(content.definition.as_str(), TextSize::Normal, BLACK)],
        ),
        section(
            "Usage in a Sentence",
            vec![TextLine::new(content.sentence.as_str(), TextSize::Normal, BLACK)],
        ),
    ];

    if !content.morphology.trim().is_empty() {
        slides.push(section(
            "Word Origin & Parts",
            vec![TextLine::new(content.morphology.as_str(), TextSize::Normal, BLACK)],
        ));
    }

    let synonyms = split_list(&content.synonyms);
    if !synonyms.is_empty() {
        slides.push(section(
            "Synonyms",
            synonyms
                .into_iter()
                .map(|s| TextLine::new(s, TextSize::Normal, GREEN))
                .collect(),
        ));
    }

    let antonyms = split_list(&content.antonyms);
    if !antonyms.is_empty() {
        slides.push(section(
            "Antonyms",
            antonyms
                .into_iter()
                .map(|s| TextLine::new(s, TextSize::Normal, RED))
                .collect(),
        ));
    }

    slides
}
