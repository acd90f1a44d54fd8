//! Safety policy rules and the local evaluator.
//!
//! A policy is an ordered list of rules; each rule is a set of pattern
//! predicates plus the action taken when any of them hits. Evaluation walks
//! the list in declaration order and stops at the first matching rule, so
//! declaration order is the severity tie-break: escalation rules must come
//! before advisory ones. This linear first-hit scan is a policy contract,
//! not an optimization target.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::verdict::SafetyVerdict;

/// Action a safety rule asks the pipeline to take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafetyAction {
    /// Message may proceed to the completion service.
    #[default]
    Allow,
    /// Answer this turn with extra care and surface the rule's guidance.
    Warn,
    /// Stop automated replies and hand the conversation to a human.
    Escalate,
}

impl SafetyAction {
    /// String form used on the wire and in audit rows.
    pub fn as_str(&self) -> &'static str {
        match self {
            SafetyAction::Allow => "allow",
            SafetyAction::Warn => "warn",
            SafetyAction::Escalate => "escalate",
        }
    }

    /// Parses the wire form back into an action.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "allow" => Some(SafetyAction::Allow),
            "warn" => Some(SafetyAction::Warn),
            "escalate" => Some(SafetyAction::Escalate),
            _ => None,
        }
    }
}

/// A single pattern predicate inside a rule.
///
/// The evaluator only ever calls [`Matcher::matches`], so new matcher kinds
/// can be added without touching evaluation logic.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Case-insensitive substring.
    Keyword(String),
    /// Compiled regular expression.
    Regex(Regex),
    /// Composite: every child matcher must match.
    AllOf(Vec<Matcher>),
}

impl Matcher {
    /// Case-insensitive keyword matcher.
    pub fn keyword(word: impl Into<String>) -> Self {
        Matcher::Keyword(word.into().to_lowercase())
    }

    /// Case-insensitive regex matcher.
    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Matcher::Regex(Regex::new(&format!("(?i){pattern}"))?))
    }

    /// Composite matcher that requires every child to match.
    pub fn all_of(children: Vec<Matcher>) -> Self {
        Matcher::AllOf(children)
    }

    /// Tests this matcher against already-trimmed text.
    pub fn matches(&self, text: &str) -> bool {
        match self {
            Matcher::Keyword(word) => text.to_lowercase().contains(word.as_str()),
            Matcher::Regex(re) => re.is_match(text),
            Matcher::AllOf(children) => children.iter().all(|m| m.matches(text)),
        }
    }
}

/// A declared safety rule.
#[derive(Debug, Clone)]
pub struct PolicyRule {
    /// Stable identifier, unique within a rule set.
    pub id: String,
    /// Human-readable description; doubles as the audit message.
    pub description: String,
    /// Action taken when any matcher hits.
    pub action: SafetyAction,
    /// Pattern predicates; any single hit triggers the rule.
    pub matchers: Vec<Matcher>,
    /// Operator guidance attached to warn/escalate replies.
    pub guidance: Option<String>,
}

impl PolicyRule {
    /// Creates a rule with no matchers yet.
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        action: SafetyAction,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            action,
            matchers: Vec::new(),
            guidance: None,
        }
    }

    /// Adds a matcher.
    pub fn with_matcher(mut self, matcher: Matcher) -> Self {
        self.matchers.push(matcher);
        self
    }

    /// Sets the guidance text.
    pub fn with_guidance(mut self, guidance: impl Into<String>) -> Self {
        self.guidance = Some(guidance.into());
        self
    }

    /// True when any matcher hits the text.
    pub fn matches(&self, text: &str) -> bool {
        self.matchers.iter().any(|m| m.matches(text))
    }
}

/// Ordered set of safety rules.
///
/// Immutable once constructed; share it behind an `Arc` across requests.
#[derive(Debug, Clone, Default)]
pub struct PolicyRuleSet {
    rules: Vec<PolicyRule>,
}

impl PolicyRuleSet {
    /// Builds a rule set from rules in priority order.
    pub fn new(rules: Vec<PolicyRule>) -> Self {
        Self { rules }
    }

    /// The built-in Mirror policy table, severe categories first.
    pub fn mirror_defaults() -> Self {
        let rules = vec![
            PolicyRule::new(
                "self-harm-escalate",
                "Deteksi indikasi bunuh diri atau self-harm berat",
                SafetyAction::Escalate,
            )
            .with_matcher(builtin(r"bunuh\s*dir[ia]"))
            .with_matcher(builtin(r"mengakhiri\s+(hidup|semua)"))
            .with_matcher(builtin(r"tidak\s+ingin\s+hidup"))
            .with_matcher(builtin(r"self[-\s]?harm"))
            .with_matcher(builtin(r"aku\s+ingin\s+mati"))
            .with_guidance(
                "Tetap tenang, validasi emosi, dan hubungkan pengguna ke bantuan manusia/hotline.",
            ),
            PolicyRule::new(
                "violence-escalate",
                "Ancaman kekerasan ke orang lain",
                SafetyAction::Escalate,
            )
            .with_matcher(builtin(r"aku\s+akan\s+melukai"))
            .with_matcher(builtin(r"aku\s+mau\s+(membunuh|menghajar)"))
            .with_matcher(builtin(r"dirampas\s+dan\s+aku\s+balas"))
            .with_guidance(
                "Aktifkan protokol bahaya: eskalasi ke tim manusia dan informasikan hotline darurat.",
            ),
            PolicyRule::new(
                "abuse-warn",
                "Curhat kekerasan atau pelecehan – perlu respons hati-hati",
                SafetyAction::Warn,
            )
            .with_matcher(builtin(r"aku\s+dianiaya"))
            .with_matcher(Matcher::keyword("digaslighting"))
            .with_matcher(Matcher::keyword("ditampar"))
            .with_matcher(Matcher::keyword("dipukul"))
            .with_matcher(Matcher::keyword("pelecehan"))
            .with_guidance(
                "Pastikan respon sangat empatik, sertakan saran aman + hotline, pertimbangkan penawaran human handoff.",
            ),
            PolicyRule::new(
                "drug-warning",
                "Permintaan saran obat atau diagnosa medis",
                SafetyAction::Warn,
            )
            .with_matcher(builtin(r"obat\s+apa\s+yang\s+harus\s+aku\s+minum"))
            .with_matcher(builtin(r"tolong\s+diagnosa"))
            .with_matcher(builtin(r"psikolog\s+atau\s+psikiater\s+mana"))
            .with_guidance(
                "Ingatkan Mirror bukan profesional medis, anjurkan konsultasi langsung dengan ahli.",
            ),
        ];

        Self { rules }
    }

    /// Rules in declaration order.
    pub fn rules(&self) -> &[PolicyRule] {
        &self.rules
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// True when the set has no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluates one user utterance against the rules.
    ///
    /// Trims the input once; blank input allows without consulting any rule.
    /// Walks rules in declaration order and returns at the first rule with a
    /// matching predicate. Pure: no I/O, no shared state, same verdict for
    /// the same input every time.
    pub fn evaluate(&self, text: &str) -> SafetyVerdict {
        let cleaned = text.trim();
        if cleaned.is_empty() {
            return SafetyVerdict::allow();
        }

        for rule in &self.rules {
            if rule.matches(cleaned) {
                return SafetyVerdict::local_match(rule);
            }
        }

        SafetyVerdict::allow()
    }
}

/// Compiles a built-in pattern. Built-ins are covered by tests, so a compile
/// failure here is a programming error.
fn builtin(pattern: &str) -> Matcher {
    Matcher::regex(pattern).expect("built-in safety pattern must compile")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verdict::VerdictSource;

    // ==== Matcher Tests ====

    #[test]
    fn keyword_matcher_is_case_insensitive() {
        let m = Matcher::keyword("Pelecehan");
        assert!(m.matches("aku mengalami PELECEHAN kemarin"));
        assert!(m.matches("pelecehan"));
        assert!(!m.matches("aku baik-baik saja"));
    }

    #[test]
    fn regex_matcher_is_case_insensitive() {
        let m = Matcher::regex(r"aku\s+ingin\s+mati").unwrap();
        assert!(m.matches("AKU INGIN MATI"));
        assert!(m.matches("kadang aku  ingin mati rasanya"));
        assert!(!m.matches("aku ingin makan"));
    }

    #[test]
    fn regex_matcher_rejects_bad_pattern() {
        assert!(Matcher::regex(r"(unclosed").is_err());
    }

    #[test]
    fn all_of_requires_every_child() {
        let m = Matcher::all_of(vec![
            Matcher::keyword("dirampas"),
            Matcher::keyword("balas"),
        ]);
        assert!(m.matches("hpku dirampas dan aku mau balas"));
        assert!(!m.matches("hpku dirampas kemarin"));
        assert!(!m.matches("aku mau balas budi"));
    }

    #[test]
    fn empty_all_of_matches_anything() {
        // all() over an empty set is vacuously true; rule authors should not
        // ship one, but the semantics are defined.
        let m = Matcher::all_of(vec![]);
        assert!(m.matches("anything"));
    }

    // ==== Rule Tests ====

    #[test]
    fn rule_matches_on_any_matcher() {
        let rule = PolicyRule::new("r", "test rule", SafetyAction::Warn)
            .with_matcher(Matcher::keyword("ditampar"))
            .with_matcher(Matcher::keyword("dipukul"));

        assert!(rule.matches("tadi aku dipukul"));
        assert!(rule.matches("aku ditampar"));
        assert!(!rule.matches("aku dimarahi"));
    }

    #[test]
    fn rule_without_matchers_never_matches() {
        let rule = PolicyRule::new("r", "empty", SafetyAction::Escalate);
        assert!(!rule.matches("anything at all"));
    }

    // ==== Evaluation Tests ====

    #[test]
    fn blank_input_allows_without_rules() {
        let rules = PolicyRuleSet::mirror_defaults();
        for input in ["", "   ", "\n\t  "] {
            let verdict = rules.evaluate(input);
            assert_eq!(verdict.action, SafetyAction::Allow);
            assert!(verdict.rule.is_none());
        }
    }

    #[test]
    fn input_is_trimmed_before_matching() {
        let rules = PolicyRuleSet::mirror_defaults();
        let verdict = rules.evaluate("   aku ingin mati   ");
        assert_eq!(verdict.action, SafetyAction::Escalate);
        assert_eq!(verdict.rule_id(), Some("self-harm-escalate"));
    }

    #[test]
    fn self_harm_disclosure_escalates() {
        let rules = PolicyRuleSet::mirror_defaults();
        let verdict = rules.evaluate("aku ingin mati");
        assert_eq!(verdict.action, SafetyAction::Escalate);
        assert_eq!(verdict.rule_id(), Some("self-harm-escalate"));
        assert_eq!(verdict.source, VerdictSource::LocalPolicy);
        assert!(verdict.guidance().is_some());
    }

    #[test]
    fn abuse_disclosure_warns() {
        let rules = PolicyRuleSet::mirror_defaults();
        let verdict = rules.evaluate("aku dianiaya pacar");
        assert_eq!(verdict.action, SafetyAction::Warn);
        assert_eq!(verdict.rule_id(), Some("abuse-warn"));
    }

    #[test]
    fn medical_advice_request_warns() {
        let rules = PolicyRuleSet::mirror_defaults();
        let verdict = rules.evaluate("obat apa yang harus aku minum biar tenang?");
        assert_eq!(verdict.action, SafetyAction::Warn);
        assert_eq!(verdict.rule_id(), Some("drug-warning"));
    }

    #[test]
    fn violence_threat_escalates() {
        let rules = PolicyRuleSet::mirror_defaults();
        let verdict = rules.evaluate("besok aku mau menghajar dia");
        assert_eq!(verdict.action, SafetyAction::Escalate);
        assert_eq!(verdict.rule_id(), Some("violence-escalate"));
    }

    #[test]
    fn first_declared_rule_wins_severity_tiebreak() {
        // Matches both abuse-warn ("aku dianiaya") and self-harm-escalate
        // ("aku ingin mati"); the escalation rule is declared first.
        let rules = PolicyRuleSet::mirror_defaults();
        let verdict = rules.evaluate("aku dianiaya terus dan sekarang aku ingin mati");
        assert_eq!(verdict.action, SafetyAction::Escalate);
        assert_eq!(verdict.rule_id(), Some("self-harm-escalate"));
    }

    #[test]
    fn scan_stops_at_first_hit_in_declaration_order() {
        let rules = PolicyRuleSet::new(vec![
            PolicyRule::new("first", "first rule", SafetyAction::Warn)
                .with_matcher(Matcher::keyword("overlap")),
            PolicyRule::new("second", "second rule", SafetyAction::Escalate)
                .with_matcher(Matcher::keyword("overlap")),
        ]);

        let verdict = rules.evaluate("this text says overlap");
        assert_eq!(verdict.rule_id(), Some("first"));
        assert_eq!(verdict.action, SafetyAction::Warn);
    }

    #[test]
    fn safe_chat_allows() {
        let rules = PolicyRuleSet::mirror_defaults();
        for input in [
            "hai, gimana harimu?",
            "aku lagi seneng banget hari ini",
            "ceritain dong tips belajar yang asik",
            "besok aku mau jalan-jalan ke pantai",
        ] {
            let verdict = rules.evaluate(input);
            assert_eq!(verdict.action, SafetyAction::Allow, "input: {input}");
            assert!(verdict.rule.is_none());
        }
    }

    #[test]
    fn evaluation_is_idempotent() {
        let rules = PolicyRuleSet::mirror_defaults();
        let first = rules.evaluate("aku dianiaya pacar");
        let second = rules.evaluate("aku dianiaya pacar");
        assert_eq!(first, second);
    }

    #[test]
    fn empty_rule_set_allows_everything() {
        let rules = PolicyRuleSet::default();
        assert!(rules.is_empty());
        let verdict = rules.evaluate("aku ingin mati");
        assert_eq!(verdict.action, SafetyAction::Allow);
    }

    #[test]
    fn default_table_shape() {
        let rules = PolicyRuleSet::mirror_defaults();
        assert_eq!(rules.len(), 4);
        let ids: Vec<&str> = rules.rules().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "self-harm-escalate",
                "violence-escalate",
                "abuse-warn",
                "drug-warning"
            ]
        );
        // Severe categories precede advisory ones.
        assert_eq!(rules.rules()[0].action, SafetyAction::Escalate);
        assert_eq!(rules.rules()[1].action, SafetyAction::Escalate);
        assert_eq!(rules.rules()[2].action, SafetyAction::Warn);
        assert_eq!(rules.rules()[3].action, SafetyAction::Warn);
        // Every built-in rule carries guidance for the reply envelope.
        assert!(rules.rules().iter().all(|r| r.guidance.is_some()));
    }

    // ==== Action Tests ====

    #[test]
    fn action_round_trips_through_strings() {
        for action in [
            SafetyAction::Allow,
            SafetyAction::Warn,
            SafetyAction::Escalate,
        ] {
            assert_eq!(SafetyAction::parse(action.as_str()), Some(action));
        }
        assert_eq!(SafetyAction::parse("block"), None);
    }

    #[test]
    fn action_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&SafetyAction::Escalate).unwrap(),
            "\"escalate\""
        );
        let parsed: SafetyAction = serde_json::from_str("\"warn\"").unwrap();
        assert_eq!(parsed, SafetyAction::Warn);
    }
}
