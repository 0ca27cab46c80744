// Content rules - an ordered list of matchers evaluated first-match-wins.
//
// Rules are checked in list order and evaluation stops at the first hit, so a
// post can only ever trigger one rule. Regexes are compiled case-insensitively
// with a backtracking engine because the rule set relies on lookaround and
// named back-references.

use super::content::{ContentField, ExtractedContent};
use super::moderation_models::RuleAction;
use super::template::MessageTemplate;
use fancy_regex::Regex;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("Invalid pattern in rule '{rule}': {source}")]
    InvalidPattern {
        rule: String,
        #[source]
        source: Box<fancy_regex::Error>,
    },

    #[error("Invalid rule file: {0}")]
    InvalidRuleFile(String),
}

// ============================================================================
// RULE TYPES
// ============================================================================

/// How a rule decides whether a post matches.
///
/// Each variant lists the content fields it inspects; a matcher with an empty
/// field list never matches.
#[derive(Debug, Clone)]
pub enum RuleMatcher {
    /// One pattern tested against each field in order.
    SingleRegex {
        pattern: Regex,
        check: Vec<ContentField>,
    },
    /// Patterns take precedence over fields: every field is tried with the
    /// first pattern before the second pattern is tried.
    MultiRegex {
        patterns: Vec<Regex>,
        check: Vec<ContentField>,
    },
    /// Exact or subdomain match on the link domain, falling back to a plain
    /// substring search in body/title when those fields are checked.
    DomainExact {
        domains: Vec<String>,
        check: Vec<ContentField>,
    },
    /// Prefix match on the link domain only.
    DomainPrefix {
        prefixes: Vec<String>,
        check: Vec<ContentField>,
    },
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub matcher: RuleMatcher,
    pub action: RuleAction,
    pub message: Option<MessageTemplate>,
    /// Whether removals by this rule may be approved back by a moderator.
    pub allow_approval: bool,
}

/// The rule that fired and the literal text or domain that fired it.
#[derive(Debug, Clone)]
pub struct RuleMatch<'a> {
    pub rule: &'a Rule,
    pub matched_value: String,
}

impl Rule {
    /// Returns the matched value if this rule applies to the content.
    pub fn matches(&self, content: &ExtractedContent) -> Option<String> {
        match &self.matcher {
            RuleMatcher::SingleRegex { pattern, check } => check
                .iter()
                .find_map(|field| self.first_match(pattern, content.field(*field))),

            RuleMatcher::MultiRegex { patterns, check } => patterns.iter().find_map(|pattern| {
                check
                    .iter()
                    .find_map(|field| self.first_match(pattern, content.field(*field)))
            }),

            RuleMatcher::DomainExact { domains, check } => {
                let domain = content.domain.as_str();
                if domain.is_empty() {
                    return None;
                }

                let listed = || domains.iter().filter(|d| !d.is_empty());

                if check.contains(&ContentField::Domain)
                    && listed().any(|d| is_same_or_subdomain(domain, d))
                {
                    return Some(domain.to_string());
                }

                let in_body = check.contains(&ContentField::Body);
                let in_title = check.contains(&ContentField::Title);
                if !in_body && !in_title {
                    return None;
                }

                listed()
                    .find(|d| {
                        (in_body && content.body.contains(d.as_str()))
                            || (in_title && content.title.contains(d.as_str()))
                    })
                    .cloned()
            }

            RuleMatcher::DomainPrefix { prefixes, check } => {
                let domain = content.domain.as_str();
                if domain.is_empty() || !check.contains(&ContentField::Domain) {
                    return None;
                }

                prefixes
                    .iter()
                    .any(|p| !p.is_empty() && domain.starts_with(p.as_str()))
                    .then(|| domain.to_string())
            }
        }
    }

    fn first_match(&self, pattern: &Regex, text: &str) -> Option<String> {
        if text.is_empty() {
            return None;
        }

        match pattern.find(text) {
            Ok(found) => found.map(|m| m.as_str().to_string()),
            Err(e) => {
                // Backtrack limit exhausted; treat as no match rather than failing the post.
                tracing::warn!(rule = %self.name, error = %e, "Regex evaluation failed");
                None
            }
        }
    }
}

fn is_same_or_subdomain(domain: &str, listed: &str) -> bool {
    domain == listed
        || domain
            .strip_suffix(listed)
            .is_some_and(|head| head.ends_with('.'))
}

/// Evaluate rules in order and return the first match.
pub fn evaluate<'a>(content: &ExtractedContent, rules: &'a [Rule]) -> Option<RuleMatch<'a>> {
    rules.iter().find_map(|rule| {
        rule.matches(content)
            .map(|matched_value| RuleMatch { rule, matched_value })
    })
}

/// Mod-log action type for a rule, e.g. `RULE_URL_SHORTENERS`.
pub fn rule_action_type(rule_name: &str) -> String {
    format!("RULE_{}", rule_name.to_uppercase().replace(' ', "_"))
}

// ============================================================================
// RULE DEFINITIONS (serialized form)
// ============================================================================

fn default_allow_approval() -> bool {
    true
}

/// A rule as written in a rules file, before its patterns are compiled.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleDefinition {
    pub name: String,
    #[serde(flatten)]
    pub matcher: MatcherDefinition,
    pub action: RuleAction,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default = "default_allow_approval")]
    pub allow_approval: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatcherDefinition {
    SingleRegex {
        pattern: String,
        check: Vec<ContentField>,
    },
    MultiRegex {
        patterns: Vec<String>,
        check: Vec<ContentField>,
    },
    DomainExact {
        domains: Vec<String>,
        check: Vec<ContentField>,
    },
    DomainPrefix {
        prefixes: Vec<String>,
        check: Vec<ContentField>,
    },
}

impl RuleDefinition {
    fn new(name: &str, matcher: MatcherDefinition, action: RuleAction) -> Self {
        Self {
            name: name.to_string(),
            matcher,
            action,
            message: None,
            allow_approval: true,
        }
    }

    fn with_message(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }

    /// Compile patterns and parse the message template.
    pub fn compile(self) -> Result<Rule, RuleError> {
        let name = self.name;
        let compile = |pattern: &str| -> Result<Regex, RuleError> {
            Regex::new(&format!("(?i){pattern}")).map_err(|e| RuleError::InvalidPattern {
                rule: name.clone(),
                source: Box::new(e),
            })
        };
        let normalize = |domains: Vec<String>| -> Vec<String> {
            domains
                .into_iter()
                .map(|d| d.trim().to_lowercase())
                .collect()
        };

        let matcher = match self.matcher {
            MatcherDefinition::SingleRegex { pattern, check } => RuleMatcher::SingleRegex {
                pattern: compile(&pattern)?,
                check,
            },
            MatcherDefinition::MultiRegex { patterns, check } => RuleMatcher::MultiRegex {
                patterns: patterns
                    .iter()
                    .map(|p| compile(p))
                    .collect::<Result<_, _>>()?,
                check,
            },
            MatcherDefinition::DomainExact { domains, check } => RuleMatcher::DomainExact {
                domains: normalize(domains),
                check,
            },
            MatcherDefinition::DomainPrefix { prefixes, check } => RuleMatcher::DomainPrefix {
                prefixes: normalize(prefixes),
                check,
            },
        };

        let message = self.message.as_deref().map(MessageTemplate::parse);

        Ok(Rule {
            name,
            matcher,
            action: self.action,
            message,
            allow_approval: self.allow_approval,
        })
    }
}

/// Compile a list of definitions, preserving their order.
pub fn compile_rules(definitions: Vec<RuleDefinition>) -> Result<Vec<Rule>, RuleError> {
    definitions.into_iter().map(RuleDefinition::compile).collect()
}

// ============================================================================
// BUILT-IN RULES
// ============================================================================

/// The built-in rule set, in priority order.
pub fn default_rule_definitions() -> Vec<RuleDefinition> {
    use ContentField::{Body, Domain, Title};

    vec![
        RuleDefinition::new(
            "Disguised Links",
            MatcherDefinition::SingleRegex {
                pattern: r"(\[(?P<text>(?:http|www)\S+)\]\((?!\k<text>)(?:http|www)\S+\))".to_string(),
                check: vec![Body],
            },
            RuleAction::Remove,
        )
        .with_message(
            "The above submission by u/{{author}} was removed because it contained a disguised link.",
        ),
        RuleDefinition::new(
            "URL Shorteners",
            MatcherDefinition::DomainExact {
                domains: to_strings(&[
                    "bit.ly", "goo.gl", "tinyurl.com", "ow.ly", "is.gd", "buff.ly", "t.co",
                ]),
                check: vec![Domain],
            },
            RuleAction::Remove,
        )
        .with_message("Your submission was removed because you used a URL shortener ({{match}})."),
        RuleDefinition::new(
            "Mobile Links",
            MatcherDefinition::DomainPrefix {
                prefixes: to_strings(&["m.", "mobile."]),
                check: vec![Domain],
            },
            RuleAction::Remove,
        )
        .with_message(
            "Your submission was automatically removed because you linked to the mobile version of a website.",
        ),
        RuleDefinition::new(
            "Banned Domains",
            MatcherDefinition::DomainExact {
                domains: to_strings(&[
                    "twitter.com",
                    "x.com",
                    "team3thirty.com",
                    "d33doz.com.au",
                    "tripappy.co",
                ]),
                check: vec![Domain, Body, Title],
            },
            RuleAction::Remove,
        )
        .with_message("Your submission was removed because we don't allow links to {{match}}."),
        RuleDefinition::new(
            "Spam Filter",
            MatcherDefinition::MultiRegex {
                patterns: to_strings(&[
                    r"qt-shirt\.com",
                    r"my-teespring\.com",
                    r"buy (it )?here\W*->",
                    r"grab yours here",
                    r"(crypto|bit)coin",
                ]),
                check: vec![Title, Body],
            },
            RuleAction::Spam,
        ),
        RuleDefinition::new(
            "Profanity Filter",
            MatcherDefinition::MultiRegex {
                patterns: to_strings(&[
                    r"((bul+|dip|horse|jack).?)?sh(\?\*|[ai]|(?!(eets?|iites?)\b)[ei]{2,})(\?\*|t)e?(bag|dick|head|load|lord|post|stain|ter|ting|ty)?s?",
                    r"((dumb|jack|smart|wise).?)?a(rse|ss)(.?(clown|fuck|hat|hole|munch|sex|tard|tastic|wipe))?(e?s)?",
                    r"(cock|dick|penis|prick)\W?(bag|head|hole|ish|less|suck|wad|weed|wheel)\w*",
                    r"(m[oua]th(a|er).?)?f(?!uch|uku)(\?\*|u|oo)+(\?\*|[ckq])+\w*",
                    r"[ck]um(?!.laude)(.?shot)?(m?ing|s)?",
                    r"c+u+n+t+([sy]|ing)?",
                ]),
                check: vec![Title, Body],
            },
            RuleAction::Filter,
        )
        .with_message("Profanity Filter Triggered"),
    ]
}

/// The built-in rule set, compiled.
pub fn default_rules() -> Result<Vec<Rule>, RuleError> {
    compile_rules(default_rule_definitions())
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// TESTS
// ============================================================================
