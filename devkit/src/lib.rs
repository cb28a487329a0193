/*!
# ink2mqtt DevKit - Stubs et utilitaires pour développement

Bibliothèque facilitant les tests du pont sans imprimante ni broker:
- Client MQTT simulé qui enregistre chaque publication
- Source hp-info scriptée (sorties et pannes à la demande)
- Fixtures de sortie `hp-info -i` au format colonnes fixes
*/

pub mod mqtt_stub;
pub mod source_stub;
pub mod test_utils;

pub use mqtt_stub::{MockMessage, MockMqttClient};
pub use source_stub::ScriptedSource;
pub use test_utils::{HpInfoFixture, LogCapture, TestHarness};
