//! Theme settings for the premium templates.

use serde::{Deserialize, Serialize};

pub const ATS_TEMPLATE: &str = "ats";
pub const PREMIUM_MODERN: &str = "premium-modern";
pub const PREMIUM_EXECUTIVE: &str = "premium-executive";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillsLayout {
    List,
    Inline,
    Grouped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillsTheme {
    pub layout: SkillsLayout,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontScale {
    pub name: u32,
    pub section: u32,
    pub body: u32,
    pub meta: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spacing {
    pub section: u32,
    pub item: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutTheme {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sidebar_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_gap: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CvTheme {
    pub primary_color: String,
    pub secondary_color: String,
    pub accent_color: String,
    pub skills: SkillsTheme,
    pub font_scale: FontScale,
    pub spacing: Spacing,
    pub layout: LayoutTheme,
}

/// Partial theme update; every present field replaces the current one.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemePatch {
    pub primary_color: Option<String>,
    pub secondary_color: Option<String>,
    pub accent_color: Option<String>,
    pub skills_layout: Option<SkillsLayout>,
    pub font_scale: Option<FontScalePatch>,
    pub spacing: Option<SpacingPatch>,
    pub layout: Option<LayoutTheme>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FontScalePatch {
    pub name: Option<u32>,
    pub section: Option<u32>,
    pub body: Option<u32>,
    pub meta: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpacingPatch {
    pub section: Option<u32>,
    pub item: Option<u32>,
}

impl CvTheme {
    pub fn apply(&mut self, patch: ThemePatch) {
        if let Some(color) = patch.primary_color {
            self.primary_color = color;
        }
        if let Some(color) = patch.secondary_color {
            self.secondary_color = color;
        }
        if let Some(color) = patch.accent_color {
            self.accent_color = color;
        }
        if let Some(layout) = patch.skills_layout {
            self.skills.layout = layout;
        }
        if let Some(scale) = patch.font_scale {
            self.font_scale.name = scale.name.unwrap_or(self.font_scale.name);
            self.font_scale.section = scale.section.unwrap_or(self.font_scale.section);
            self.font_scale.body = scale.body.unwrap_or(self.font_scale.body);
            self.font_scale.meta = scale.meta.unwrap_or(self.font_scale.meta);
        }
        if let Some(spacing) = patch.spacing {
            self.spacing.section = spacing.section.unwrap_or(self.spacing.section);
            self.spacing.item = spacing.item.unwrap_or(self.spacing.item);
        }
        if let Some(layout) = patch.layout {
            self.layout.sidebar_width = layout.sidebar_width.or(self.layout.sidebar_width);
            self.layout.column_gap = layout.column_gap.or(self.layout.column_gap);
        }
    }
}

/// Whether `template` accepts theme customisation.
pub fn supports_theme(template: &str) -> bool {
    matches!(template, PREMIUM_MODERN | PREMIUM_EXECUTIVE)
}

/// Built-in theme of a template. Templates without their own theme fall back
/// to the premium-modern defaults.
pub fn default_theme(template: &str) -> CvTheme {
    match template {
        PREMIUM_EXECUTIVE => CvTheme {
            primary_color: "#0f172a".to_string(),
            secondary_color: "#1e293b".to_string(),
            accent_color: "#1e293b".to_string(),
            skills: SkillsTheme {
                layout: SkillsLayout::List,
            },
            font_scale: FontScale {
                name: 22,
                section: 11,
                body: 12,
                meta: 10,
            },
            spacing: Spacing {
                section: 12,
                item: 10,
            },
            layout: LayoutTheme {
                sidebar_width: Some(220),
                column_gap: Some(24),
            },
        },
        _ => CvTheme {
            primary_color: "#0f172a".to_string(),
            secondary_color: "#475569".to_string(),
            accent_color: "#0f766e".to_string(),
            skills: SkillsTheme {
                layout: SkillsLayout::List,
            },
            font_scale: FontScale {
                name: 26,
                section: 10,
                body: 12,
                meta: 10,
            },
            spacing: Spacing {
                section: 14,
                item: 10,
            },
            layout: LayoutTheme {
                sidebar_width: None,
                column_gap: Some(20),
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_premium_templates_support_theme() {
        assert!(supports_theme(PREMIUM_MODERN));
        assert!(supports_theme(PREMIUM_EXECUTIVE));
        assert!(!supports_theme(ATS_TEMPLATE));
    }

    #[test]
    fn test_unknown_template_falls_back_to_modern() {
        assert_eq!(default_theme("classic"), default_theme(PREMIUM_MODERN));
        assert_ne!(default_theme(PREMIUM_EXECUTIVE), default_theme(PREMIUM_MODERN));
    }

    #[test]
    fn test_patch_merges_nested_fields() {
        let mut theme = default_theme(PREMIUM_EXECUTIVE);
        theme.apply(ThemePatch {
            accent_color: Some("#ff0000".to_string()),
            font_scale: Some(FontScalePatch {
                body: Some(13),
                ..FontScalePatch::default()
            }),
            layout: Some(LayoutTheme {
                sidebar_width: None,
                column_gap: Some(30),
            }),
            ..ThemePatch::default()
        });

        assert_eq!(theme.accent_color, "#ff0000");
        assert_eq!(theme.font_scale.body, 13);
        assert_eq!(theme.font_scale.name, 22);
        assert_eq!(theme.layout.sidebar_width, Some(220));
        assert_eq!(theme.layout.column_gap, Some(30));
    }
}
