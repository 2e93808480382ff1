//! Per-character skill records.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::clock::Millis;
use crate::error::StoreError;

/// The fixed set of tracked skills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillKind {
    Writing,
    Conveyance,
    Translation,
}

impl SkillKind {
    pub const ALL: [SkillKind; 3] = [
        SkillKind::Writing,
        SkillKind::Conveyance,
        SkillKind::Translation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SkillKind::Writing => "writing",
            SkillKind::Conveyance => "conveyance",
            SkillKind::Translation => "translation",
        }
    }
}

impl fmt::Display for SkillKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SkillKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SkillKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| StoreError::UnknownSkill(s.to_string()))
    }
}

/// Level and recency of one skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    #[serde(rename = "skillName")]
    pub name: SkillKind,
    pub level: u32,
    pub last_updated: Millis,
}

impl Skill {
    pub fn new(name: SkillKind, now: Millis) -> Self {
        Self {
            name,
            level: 0,
            last_updated: now,
        }
    }
}

/// All three skills of a character. A partial set cannot be represented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillSet {
    pub writing: Skill,
    pub conveyance: Skill,
    pub translation: Skill,
}

impl SkillSet {
    pub fn new(now: Millis) -> Self {
        Self {
            writing: Skill::new(SkillKind::Writing, now),
            conveyance: Skill::new(SkillKind::Conveyance, now),
            translation: Skill::new(SkillKind::Translation, now),
        }
    }

    pub fn get(&self, kind: SkillKind) -> &Skill {
        match kind {
            SkillKind::Writing => &self.writing,
            SkillKind::Conveyance => &self.conveyance,
            SkillKind::Translation => &self.translation,
        }
    }

    pub fn get_mut(&mut self, kind: SkillKind) -> &mut Skill {
        match kind {
            SkillKind::Writing => &mut self.writing,
            SkillKind::Conveyance => &mut self.conveyance,
            SkillKind::Translation => &mut self.translation,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Skill> {
        [&self.writing, &self.conveyance, &self.translation].into_iter()
    }
}

/// Spaced-repetition state of one character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SrsData {
    pub character: String,
    pub last_updated: Millis,
    pub last_created: Millis,
    pub skills: SkillSet,
}

impl SrsData {
    /// Fresh record: every skill at level 0, all timestamps `now`.
    pub fn new(character: impl Into<String>, now: Millis) -> Self {
        Self {
            character: character.into(),
            last_updated: now,
            last_created: now,
            skills: SkillSet::new(now),
        }
    }

    pub fn skill(&self, kind: SkillKind) -> &Skill {
        self.skills.get(kind)
    }

    /// Record a new level for one skill at `now`.
    ///
    /// `last_updated` never moves backwards, so it stays the maximum of every
    /// skill's update time.
    pub fn set_skill_level(&mut self, kind: SkillKind, level: u32, now: Millis) {
        let skill = self.skills.get_mut(kind);
        skill.level = level;
        skill.last_updated = now;
        self.last_updated = self.last_updated.max(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_srs_data_has_all_skills() {
        let data = SrsData::new("水", 100);
        assert_eq!(data.last_created, 100);
        assert_eq!(data.skills.iter().count(), 3);
        for kind in SkillKind::ALL {
            let skill = data.skill(kind);
            assert_eq!(skill.name, kind);
            assert_eq!(skill.level, 0);
            assert_eq!(skill.last_updated, 100);
        }
    }

    #[test]
    fn test_set_skill_level() {
        let mut data = SrsData::new("水", 100);
        data.set_skill_level(SkillKind::Writing, 3, 200);

        assert_eq!(data.skill(SkillKind::Writing).level, 3);
        assert_eq!(data.skill(SkillKind::Writing).last_updated, 200);
        assert_eq!(data.skill(SkillKind::Translation).level, 0);
        assert_eq!(data.skill(SkillKind::Translation).last_updated, 100);
        assert_eq!(data.last_updated, 200);
        assert_eq!(data.last_created, 100);
    }

    #[test]
    fn test_last_updated_never_regresses() {
        let mut data = SrsData::new("水", 500);
        data.set_skill_level(SkillKind::Conveyance, 1, 400);
        assert_eq!(data.last_updated, 500);
        assert_eq!(data.skill(SkillKind::Conveyance).last_updated, 400);
    }

    #[test]
    fn test_skill_kind_from_str() {
        assert_eq!("writing".parse::<SkillKind>().unwrap(), SkillKind::Writing);
        assert_eq!("Translation".parse::<SkillKind>().unwrap(), SkillKind::Translation);
        assert!(matches!(
            "reading".parse::<SkillKind>(),
            Err(StoreError::UnknownSkill(_))
        ));
    }

    #[test]
    fn test_json_shape() {
        let data = SrsData::new("水", 7);
        let value = serde_json::to_value(&data).unwrap();

        assert_eq!(value["character"], "水");
        assert_eq!(value["lastUpdated"], 7);
        assert_eq!(value["lastCreated"], 7);
        assert_eq!(value["skills"]["writing"]["skillName"], "writing");
        assert_eq!(value["skills"]["translation"]["lastUpdated"], 7);

        let back: SrsData = serde_json::from_value(value).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn test_partial_skill_set_is_rejected() {
        let json = r#"{
            "character": "水",
            "lastUpdated": 1,
            "lastCreated": 1,
            "skills": {"writing": {"skillName": "writing", "level": 0, "lastUpdated": 1}}
        }"#;
        assert!(serde_json::from_str::<SrsData>(json).is_err());
    }
}
