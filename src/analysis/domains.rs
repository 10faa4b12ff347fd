//! Built-in domain-defaults table (SPEC_FULL.md §4.5, §9, "Supplemented
//! features"): keyword padding source for [`super::PromptAnalyzer`] and
//! match terms for [`crate::guardrail`].
//!
//! Carried verbatim in spirit from `prompt_analyzer.py`'s `domain_defaults`
//! / `domain_indicators` tables in `original_source/`.

/// One built-in domain: its canonical name, keyword list (used both to pad
/// `domain_keywords` and as guardrail signature terms), and the handful of
/// indicator words used for lexical fallback detection.
pub struct DomainDefaults {
    /// Canonical domain name, e.g. `"medical"`.
    pub name: &'static str,
    /// Keyword vocabulary for this domain (up to 20, per the original).
    pub keywords: &'static [&'static str],
    /// A narrower subset used to cheaply detect this domain from raw text.
    pub indicators: &'static [&'static str],
}

/// The built-in domain table: medical, legal, cooking, technology, finance.
pub const DOMAINS: &[DomainDefaults] = &[
    DomainDefaults {
        name: "medical",
        keywords: &[
            "health", "patient", "doctor", "treatment", "diagnosis", "symptoms", "medicine", "hospital",
            "disease", "therapy", "prescription", "clinic", "medical", "healthcare", "wellness", "condition",
            "care", "physician", "nurse", "medication",
        ],
        indicators: &["medical", "doctor", "patient", "health", "hospital", "treatment"],
    },
    DomainDefaults {
        name: "legal",
        keywords: &[
            "law", "court", "legal", "attorney", "lawyer", "case", "contract", "rights", "litigation",
            "judge", "verdict", "lawsuit", "compliance", "regulation", "statute", "defendant", "plaintiff",
            "trial", "evidence", "testimony",
        ],
        indicators: &["legal", "law", "attorney", "court", "contract", "rights"],
    },
    DomainDefaults {
        name: "cooking",
        keywords: &[
            "recipe", "cook", "ingredient", "food", "kitchen", "meal", "dish", "flavor", "cuisine", "bake",
            "chef", "cooking", "taste", "serve", "prepare", "dinner", "lunch", "breakfast", "snack", "dessert",
        ],
        indicators: &["cook", "recipe", "food", "chef", "kitchen", "ingredient"],
    },
    DomainDefaults {
        name: "technology",
        keywords: &[
            "software", "code", "programming", "computer", "system", "data", "network", "security", "cloud",
            "application", "development", "algorithm", "database", "api", "server", "hardware", "digital",
            "technology", "tech", "it",
        ],
        indicators: &["tech", "software", "code", "programming", "computer"],
    },
    DomainDefaults {
        name: "finance",
        keywords: &[
            "money", "investment", "bank", "finance", "budget", "tax", "stock", "credit", "loan", "savings",
            "financial", "accounting", "capital", "asset", "portfolio", "market", "trading", "insurance",
            "wealth", "income",
        ],
        indicators: &["finance", "money", "bank", "investment", "budget"],
    },
];

/// Looks up a domain's keyword list by name (case-insensitive).
#[must_use]
pub fn keywords_for(domain: &str) -> Option<&'static [&'static str]> {
    DOMAINS
        .iter()
        .find(|d| d.name.eq_ignore_ascii_case(domain))
        .map(|d| d.keywords)
}

/// Detects a domain from free text by indicator-word presence. Returns the
/// first domain (in table order) with at least one indicator word present;
/// `"general"` if none match.
#[must_use]
pub fn detect_domain(text: &str) -> &'static str {
    let lowercase = text.to_lowercase();
    let words: Vec<&str> = lowercase.split_whitespace().collect();

    for domain in DOMAINS {
        if domain.indicators.iter().any(|ind| words.contains(ind)) {
            return domain.name;
        }
    }
    "general"
}

/// A starter system-prompt template for a common domain.
pub struct PromptTemplate {
    /// Human-facing template name, e.g. `"Medical Assistant"`.
    pub name: &'static str,
    /// Domain the template targets.
    pub domain: &'static str,
    /// The template body.
    pub template: &'static str,
}

/// Five starter system-prompt templates, one per built-in domain. Not part
/// of the formal contract, but carried from `get_prompt_templates()` in
/// `original_source/` as a convenience for the demo binary's `init` flow
/// (SPEC_FULL.md §AMBIENT, "Supplemented features").
#[must_use]
pub const fn starter_templates() -> &'static [PromptTemplate] {
    &[
        PromptTemplate {
            name: "Medical Assistant",
            domain: "medical",
            template: "You are a knowledgeable medical information assistant. Your role is to provide accurate health information based on your knowledge base. You should be empathetic, professional, and always recommend consulting healthcare professionals for personal medical advice. Never provide diagnoses - only educational information.",
        },
        PromptTemplate {
            name: "Legal Advisor",
            domain: "legal",
            template: "You are a legal information assistant providing general legal knowledge. Be professional and precise in your explanations. Always clarify that you provide educational information, not legal advice. Recommend consulting a licensed attorney for specific legal matters.",
        },
        PromptTemplate {
            name: "Recipe Chef",
            domain: "cooking",
            template: "You are a friendly culinary assistant with expertise in cooking and recipes. Help users with cooking techniques, ingredient substitutions, and recipe adaptations. Be enthusiastic about food and encourage culinary exploration.",
        },
        PromptTemplate {
            name: "Tech Support",
            domain: "technology",
            template: "You are a technical support specialist helping users with technology questions. Explain complex concepts in simple terms. Provide step-by-step troubleshooting guidance. Be patient and thorough in your explanations.",
        },
        PromptTemplate {
            name: "Financial Guide",
            domain: "finance",
            template: "You are a financial information assistant providing educational content about personal finance. Be clear and professional when explaining financial concepts. Always remind users that this is educational information, not financial advice.",
        },
    ]
}
