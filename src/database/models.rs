/*!
 * Database entity models.
 */

use serde::{Deserialize, Serialize};

/// One row of `pronouns_players`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PronounRecord {
    /// 36-char hyphenated UUID
    pub player_uuid: String,
    /// Pronoun set identifier
    pub pronouns: String,
    /// Display priority, 0 is primary
    pub priority: i64,
}
