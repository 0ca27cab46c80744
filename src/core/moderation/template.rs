// Removal message templates with a fixed set of named placeholders.

/// Placeholders a removal message may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    /// `{{author}}` - username of the post author
    Author,
    /// `{{match}}` - the text or domain that triggered the rule
    Match,
    /// `{{kind}}` - always `submission` for posts
    Kind,
}

impl Placeholder {
    const ALL: [Placeholder; 3] = [Placeholder::Author, Placeholder::Match, Placeholder::Kind];

    pub fn name(&self) -> &'static str {
        match self {
            Placeholder::Author => "author",
            Placeholder::Match => "match",
            Placeholder::Kind => "kind",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Token(Placeholder),
}

/// Values substituted into a template.
#[derive(Debug, Clone, Copy)]
pub struct TemplateValues<'a> {
    pub author: &'a str,
    pub matched: &'a str,
    pub kind: &'a str,
}

/// A parsed message template.
///
/// Known `{{name}}` tokens become placeholders; any other `{{...}}` text is
/// kept literally. Only the first occurrence of each placeholder is
/// substituted, later repeats stay as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTemplate {
    segments: Vec<Segment>,
}

impl MessageTemplate {
    pub fn parse(source: &str) -> Self {
        let mut segments = Vec::new();
        let mut seen: Vec<Placeholder> = Vec::new();
        let mut literal = String::new();
        let mut rest = source;

        while let Some(open) = rest.find("{{") {
            literal.push_str(&rest[..open]);
            let after_open = &rest[open + 2..];

            let token = after_open
                .find("}}")
                .and_then(|close| Placeholder::from_name(&after_open[..close]).map(|p| (p, close)))
                .filter(|(placeholder, _)| !seen.contains(placeholder));

            match token {
                Some((placeholder, close)) => {
                    seen.push(placeholder);
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Token(placeholder));
                    rest = &after_open[close + 2..];
                }
                None => {
                    // Not a placeholder (or a repeat): keep one brace and rescan
                    // from the next.
                    literal.push('{');
                    rest = &rest[open + 1..];
                }
            }
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Self { segments }
    }

    pub fn render(&self, values: &TemplateValues<'_>) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Token(Placeholder::Author) => out.push_str(values.author),
                Segment::Token(Placeholder::Match) => out.push_str(values.matched),
                Segment::Token(Placeholder::Kind) => out.push_str(values.kind),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALUES: TemplateValues<'static> = TemplateValues {
        author: "trainspotter",
        matched: "bit.ly",
        kind: "submission",
    };

    #[test]
    fn test_substitutes_known_tokens() {
        let template =
            MessageTemplate::parse("Your {{kind}} by u/{{author}} used a URL shortener ({{match}}).");
        assert_eq!(
            template.render(&VALUES),
            "Your submission by u/trainspotter used a URL shortener (bit.ly)."
        );
    }

    #[test]
    fn test_unknown_tokens_stay_literal() {
        let template = MessageTemplate::parse("{{user}} wrote {{ match }} and {{match}}");
        assert_eq!(template.render(&VALUES), "{{user}} wrote {{ match }} and bit.ly");
    }

    #[test]
    fn test_unclosed_and_nested_braces() {
        let template = MessageTemplate::parse("{{{author}}} said {{");
        assert_eq!(template.render(&VALUES), "{trainspotter} said {{");
    }

    #[test]
    fn test_match_value_is_not_reinterpreted() {
        let template = MessageTemplate::parse("matched {{match}}");
        let values = TemplateValues {
            matched: "{{author}}",
            ..VALUES
        };
        assert_eq!(template.render(&values), "matched {{author}}");
    }

    #[test]
    fn test_repeated_placeholder_is_substituted_once() {
        let template = MessageTemplate::parse("{{author}} and {{author}}, {{match}} {{match}}");
        assert_eq!(
            template.render(&VALUES),
            "trainspotter and {{author}}, bit.ly {{match}}"
        );
    }

    #[test]
    fn test_plain_text_round_trips() {
        let template = MessageTemplate::parse("Profanity Filter Triggered");
        assert_eq!(template.render(&VALUES), "Profanity Filter Triggered");
    }
}
