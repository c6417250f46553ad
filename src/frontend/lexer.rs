//! This lexer tokenizes HRA source.
//!
//! Every keyword of the language is a phrase of one or more words. Words are
//! classified one at a time first, then runs of unclassified words are folded
//! back into the multi-word keywords they spell out.

/// A line whose first word starts with this marker is ignored.
pub const COMMENT: &str = "#";

#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum TokenKind {
    RightMemory,
    LeftMemory,
    MoveMemory,
    CopyValue,
    RightInstruction,
    LeftInstruction,
    MoveInstruction,
    Print,
    Function,
    Close,
    Call,
    Exit,
    Greater,
    Less,
    Equal,
    Unequal,
    Set,
    Increment,
    Decrement,
    Multiply,
    /// Any word that is not (part of) a keyword: numbers and names.
    Literal,
    /// Has no spelling, so it can never be produced from source text.
    Reserved,
}

const KEYWORDS: [(TokenKind, &str); 20] = [
    (TokenKind::RightMemory,      "plus memory pointer"),
    (TokenKind::LeftMemory,       "min memory pointer"),
    (TokenKind::MoveMemory,       "move memory pointer to"),
    (TokenKind::CopyValue,        "copy value to"),
    (TokenKind::RightInstruction, "plus instruction pointer"),
    (TokenKind::LeftInstruction,  "min instruction pointer"),
    (TokenKind::MoveInstruction,  "move instruction pointer to"),
    (TokenKind::Print,            "print"),
    (TokenKind::Function,         "make function"),
    (TokenKind::Close,            "close"),
    (TokenKind::Call,             "run function"),
    (TokenKind::Exit,             "exit"),
    (TokenKind::Greater,          "greater compare between"),
    (TokenKind::Less,             "less compare between"),
    (TokenKind::Equal,            "equal compare between"),
    (TokenKind::Unequal,          "unequal compare between"),
    (TokenKind::Set,              "set value to"),
    (TokenKind::Increment,        "increment pointer by"),
    (TokenKind::Decrement,        "decrement pointer by"),
    (TokenKind::Multiply,         "multiply pointer by"),
];

impl TokenKind {
    /// The source spelling of a keyword kind.
    pub fn keyword(&self) -> Option<&'static str> {
        KEYWORDS.iter()
            .find(|(kind, _)| kind == self)
            .map(|(_, text)| *text)
    }

    fn from_word(word: &str) -> TokenKind {
        KEYWORDS.iter()
            .find(|(_, text)| *text == word)
            .map(|(kind, _)| *kind)
            .unwrap_or(TokenKind::Literal)
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Token {
    pub kind: TokenKind,
    /// 1-based index among the lines that survived blank and comment removal.
    pub line: usize,
    pub content: String,
}

impl Token {
    pub fn new<S: Into<String>>(kind: TokenKind, line: usize, content: S) -> Self {
        Token { kind, line, content: content.into() }
    }
}

/// HRA only supports a single instruction per line.
/// Returns one row of tokens per logical line, in source order.
pub fn tokenize(source: &str) -> Vec<Vec<Token>> {
    let rows: Vec<Vec<Token>> = source.lines()
        .map(|line| line.split_whitespace().collect::<Vec<&str>>())
        .filter(|words| match words.first() {
            Some(first) => !first.starts_with(COMMENT),
            None => false,
        })
        .enumerate()
        .map(|(index, words)| tokenize_line(&words, index + 1))
        .collect();

    debug!("tokenized {} logical line(s)", rows.len());
    rows
}

fn tokenize_line(words: &[&str], line: usize) -> Vec<Token> {
    let row = words.iter()
        .map(|word| Token::new(TokenKind::from_word(word), line, *word))
        .collect();
    let row = reassemble(row);
    trace!("line {}: {:?}", line, row);
    row
}

/// Folds runs of literal tokens that spell a multi-word keyword into a single
/// keyword token. The scan is greedy and leftmost: the candidate run only ever
/// holds words that are a prefix of some phrase, and it is collapsed as soon
/// as it spells a whole one.
fn reassemble(mut row: Vec<Token>) -> Vec<Token> {
    let mut start = 0;
    let mut index = 0;

    while index < row.len() {
        if row[index].kind != TokenKind::Literal {
            index += 1;
            start = index;
            continue;
        }

        while start <= index && !is_phrase_prefix(&row[start..=index]) {
            start += 1;
        }

        if start <= index {
            if let Some(kind) = phrase(&row[start..=index]) {
                let content = join(&row[start..=index]);
                let token = Token::new(kind, row[start].line, content);
                row.drain(start..=index);
                row.insert(start, token);
                index = start + 1;
                start = index;
                continue;
            }
        }

        index += 1;
    }

    row
}

fn is_phrase_prefix(run: &[Token]) -> bool {
    KEYWORDS.iter().any(|(_, text)| {
        let words: Vec<&str> = text.split(' ').collect();
        words.len() > 1
            && words.len() >= run.len()
            && run.iter().zip(words.iter()).all(|(token, word)| token.content == *word)
    })
}

fn phrase(run: &[Token]) -> Option<TokenKind> {
    let text = join(run);
    KEYWORDS.iter()
        .find(|(_, keyword)| keyword.contains(' ') && *keyword == text)
        .map(|(kind, _)| *kind)
}

fn join(run: &[Token]) -> String {
    run.iter()
        .map(|token| token.content.as_str())
        .collect::<Vec<&str>>()
        .join(" ")
}
