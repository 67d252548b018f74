//! Richtlinien fuer externe Handler (z.B. Nachrichten-Versand)

use murmur_core::{KanalTyp, UserId};
use murmur_db::{KanalRecord, Store};

use crate::error::SignalingResult;

/// Darf `absender` in diesem Kanal eine Nachricht senden?
///
/// Gruppenkanaele sind immer erlaubt. In privaten Kanaelen muss eine
/// angenommene Freundschaft zum anderen Mitglied bestehen.
pub async fn direktnachricht_erlaubt<S: Store>(
    store: &S,
    kanal: &KanalRecord,
    absender: UserId,
) -> SignalingResult<bool> {
    if kanal.typ == KanalTyp::Group {
        return Ok(true);
    }
    let Some(anderer) = kanal.users.iter().map(|m| m.id).find(|id| *id != absender) else {
        return Ok(false);
    };
    let freundschaft = store.freundschaft(absender, anderer).await?;
    Ok(freundschaft.is_some_and(|f| f.accepted))
}
