//! Character catalog types

use serde::{Deserialize, Serialize};

/// Fields of an upstream character record used for favorites enrichment.
/// Catalog listings are forwarded as raw JSON and never pass through this type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub species: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    /// Episode references (URLs) the character appears in
    #[serde(default)]
    pub episode: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_upstream_character_with_extra_fields() {
        let json = r#"{
            "id": 1,
            "name": "Rick Sanchez",
            "status": "Alive",
            "species": "Human",
            "type": "",
            "gender": "Male",
            "origin": {"name": "Earth (C-137)", "url": ""},
            "image": "https://rickandmortyapi.com/api/character/avatar/1.jpeg",
            "episode": [
                "https://rickandmortyapi.com/api/episode/1",
                "https://rickandmortyapi.com/api/episode/2"
            ]
        }"#;

        let character: Character = serde_json::from_str(json).unwrap();
        assert_eq!(character.id, 1);
        assert_eq!(character.name, "Rick Sanchez");
        assert_eq!(character.episode.len(), 2);
    }

    #[test]
    fn missing_episode_list_defaults_to_empty() {
        let character: Character = serde_json::from_str(r#"{"id": 7, "name": "Abradolf Lincler"}"#).unwrap();
        assert!(character.episode.is_empty());
        assert!(character.status.is_none());
    }
}
