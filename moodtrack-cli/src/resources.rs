/// Support contacts and reading material shown by `moodtrack resources`

pub struct Resource {
    pub title: &'static str,
    pub description: &'static str,
    pub contact: Option<&'static str>,
}

/// Always shown first, and again whenever a high risk assessment comes back
pub const CRISIS_LINES: &[Resource] = &[
    Resource {
        title: "988 Suicide & Crisis Lifeline",
        description: "24/7 crisis support by phone or text",
        contact: Some("call or text 988"),
    },
    Resource {
        title: "Postpartum support helpline",
        description: "Talk to someone who understands postpartum mood changes",
        contact: Some("call 1-800-PPD-MOMS"),
    },
    Resource {
        title: "Crisis Text Line",
        description: "Free, confidential support over text message",
        contact: Some("text HOME to 741741"),
    },
];

pub const READING: &[Resource] = &[
    Resource {
        title: "Understanding Postpartum Depression",
        description: "Learn about symptoms, causes, and treatment options",
        contact: None,
    },
    Resource {
        title: "Coping Strategies",
        description: "Practical techniques for managing difficult emotions",
        contact: None,
    },
    Resource {
        title: "Support Groups",
        description: "Connect with others who understand your journey",
        contact: None,
    },
    Resource {
        title: "Professional Help",
        description: "When and how to seek professional support",
        contact: None,
    },
    Resource {
        title: "Self-Care Activities",
        description: "Gentle activities to support your wellbeing",
        contact: None,
    },
];

pub const SUPPORT_EMAIL: &str = "support@emotiontracker.app";
