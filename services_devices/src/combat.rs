//! Combat device

use crate::abilities::AbilityScore;
use crate::config::CombatConfig;
use crate::entity::{i64_field, load, store, Selection};
use core_types::document::{self, PROPERTIES};
use core_types::{DeviceRequest, Errno, KResult};
use kernel_api::{Capability, IoRequest, KernelRef};
use log::{debug, error};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use services_effects::{derive_effect_id, saturating_sum, EffectBook, EffectEngine};
use std::cell::RefCell;
use std::rc::Rc;

/// Saving throws and their key ability
pub const SAVES: [(&str, &str); 3] = [
    ("fortitude", "constitution"),
    ("reflex", "dexterity"),
    ("will", "wisdom"),
];

/// Derived combat statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatStats {
    pub base_attack_bonus: i64,
    pub ac: i64,
    pub flat_footed_ac: i64,
    pub initiative: i64,
    pub melee_attack: i64,
    pub ranged_attack: i64,
    pub cmb: i64,
    pub cmd: i64,
}

impl CombatStats {
    fn derive(doc: &Value, engine: &EffectEngine, bab: i64) -> Self {
        let strength = AbilityScore::resolve(doc, engine, "strength").modifier;
        let dexterity = AbilityScore::resolve(doc, engine, "dexterity").modifier;
        let effects = |target: &str| engine.apply_numeric_effects(target, None).total;

        let ac_effects = effects("ac");
        let flat_footed_ac = saturating_sum([10, dexterity.min(0), ac_effects]);
        let ac = if engine.apply_boolean_effects("condition.flat_footed", false) {
            flat_footed_ac
        } else {
            saturating_sum([10, dexterity, ac_effects])
        };
        Self {
            base_attack_bonus: bab,
            ac,
            flat_footed_ac,
            initiative: saturating_sum([dexterity, effects("initiative")]),
            melee_attack: saturating_sum([bab, strength, effects("attack.melee")]),
            ranged_attack: saturating_sum([bab, dexterity, effects("attack.ranged")]),
            cmb: saturating_sum([bab, strength, effects("cmb")]),
            cmd: saturating_sum([10, bab, strength, dexterity, effects("cmd")]),
        }
    }
}

/// Derives AC, initiative, attacks and saves from ability modifiers
pub struct CombatDevice {
    kernel: KernelRef,
    effects: Rc<RefCell<EffectBook>>,
    config: CombatConfig,
    selection: Selection,
    debug: bool,
}

impl CombatDevice {
    pub fn new(kernel: KernelRef, effects: Rc<RefCell<EffectBook>>, config: CombatConfig) -> Self {
        Self {
            kernel,
            effects,
            config,
            selection: Selection::default(),
            debug: false,
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    fn bab(&self, arg: &Value, doc: &Value) -> i64 {
        i64_field(arg, "baseAttackBonus")
            .or_else(|| {
                doc.get(PROPERTIES)
                    .and_then(|p| i64_field(p, "baseAttackBonus"))
            })
            .unwrap_or(self.config.base_attack_bonus)
    }

    /// Derives stats and stores them at `properties.combat`
    fn calc_combat(&self, arg: &Value) -> KResult<Value> {
        let target = self.selection.target(arg)?;
        let mut doc = load(&self.kernel, &target.path)?;
        let stats = {
            let book = self.effects.borrow();
            CombatStats::derive(&doc, book.engine(&target.id), self.bab(arg, &doc))
        };
        let now = self.kernel.get()?.now().as_millis();
        let stats = json!(stats);
        document::properties_mut(&mut doc)?.insert("combat".to_string(), stats.clone());
        document::touch(&mut doc, now)?;
        store(&self.kernel, &target.path, doc)?;
        Ok(stats)
    }

    fn save_total(doc: &Value, engine: &EffectEngine, save: &str, ability: &str) -> Value {
        let base = doc
            .get(PROPERTIES)
            .and_then(|p| p.get("saves"))
            .and_then(|s| s.get(save))
            .and_then(|s| i64_field(s, "base").or_else(|| s.as_i64()))
            .unwrap_or(0);
        let ability_modifier = AbilityScore::resolve(doc, engine, ability).modifier;
        let bonus = engine
            .apply_numeric_effects(&format!("saving_throw.{}", save), None)
            .total;
        json!({
            "base": base,
            "abilityModifier": ability_modifier,
            "bonus": bonus,
            "total": saturating_sum([base, ability_modifier, bonus]),
        })
    }

    /// One save when `save` is given, else all three
    fn calc_save(&self, arg: &Value) -> KResult<Value> {
        let target = self.selection.target(arg)?;
        let doc = load(&self.kernel, &target.path)?;
        let book = self.effects.borrow();
        let engine = book.engine(&target.id);
        match document::str_field(arg, "save") {
            Some(save) => {
                let (save, ability) = SAVES
                    .iter()
                    .find(|(name, _)| *name == save)
                    .ok_or(Errno::EINVAL)?;
                Ok(Self::save_total(&doc, engine, save, ability))
            }
            None => Ok(Value::Object(
                SAVES
                    .iter()
                    .map(|(save, ability)| {
                        (save.to_string(), Self::save_total(&doc, engine, save, ability))
                    })
                    .collect(),
            )),
        }
    }

    /// Sets or clears `condition.{name}`
    fn apply_condition(&self, arg: &Value) -> KResult<Value> {
        let target = self.selection.target(arg)?;
        let condition = document::require_str(arg, "condition")?;
        let active = arg.get("active").and_then(Value::as_bool).unwrap_or(true);
        let stat = format!("condition.{}", condition);
        let default_source = format!("condition:{}", condition);
        let source = document::str_field(arg, "source").unwrap_or(&default_source);

        let mut book = self.effects.borrow_mut();
        let engine = book.engine_mut(&target.id);
        if active {
            let id = engine.register_boolean_effect(&target.id, &stat, source, true, None);
            Ok(json!({ "id": id, "active": true }))
        } else {
            let id = derive_effect_id(&target.id, &stat, source);
            engine.remove_effect(&id);
            Ok(json!({ "id": id, "active": false }))
        }
    }

    fn read_selected(&self) -> KResult<Value> {
        let target = self.selection.target(&Value::Null)?;
        let doc = load(&self.kernel, &target.path)?;
        let book = self.effects.borrow();
        Ok(json!(CombatStats::derive(
            &doc,
            book.engine(&target.id),
            self.bab(&Value::Null, &doc)
        )))
    }
}

impl Capability for CombatDevice {
    fn id(&self) -> &str {
        "combat"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn on_mount(&self) -> KResult<()> {
        self.kernel.get().map(|_| ())
    }

    fn on_unmount(&self) {
        self.selection.clear();
    }

    /// Derives the selected entity's stats without storing them
    fn read(&self, _request: &IoRequest) -> KResult<Value> {
        self.read_selected()
    }

    fn ioctl(&self, request: &IoRequest, code: u32, arg: Value) -> KResult<Value> {
        if self.debug {
            debug!("combat: ioctl {} on {}", code, request.path);
        }
        let result = match DeviceRequest::from_code(code) {
            Some(DeviceRequest::Initialize) | Some(DeviceRequest::CalcCombat) => {
                self.calc_combat(&arg)
            }
            Some(DeviceRequest::SetCharacter) => self.selection.select(&arg),
            Some(DeviceRequest::CalcSave) => self.calc_save(&arg),
            Some(DeviceRequest::ApplyCondition) => self.apply_condition(&arg),
            _ => Err(Errno::EINVAL),
        };
        if let Err(Errno::EIO) = result {
            error!("combat: ioctl {} failed: {}", code, Errno::EIO);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::OpenMode;
    use kernel_api::KernelApi;
    use vfs_kernel::{KernelConfig, VfsKernel};

    fn boot(config: CombatConfig) -> (Rc<VfsKernel>, Rc<RefCell<EffectBook>>) {
        let kernel = VfsKernel::new(KernelConfig::default());
        let book = Rc::new(RefCell::new(EffectBook::new()));
        let shared = Rc::clone(&book);
        kernel
            .mount("/dev/combat", move |k| CombatDevice::new(k, shared, config))
            .unwrap();
        kernel
            .create(
                "/entity/character/7",
                json!({
                    "id": "7",
                    "properties": {
                        "strength": { "value": 14 },
                        "dexterity": { "value": 16 },
                        "wisdom": { "value": 8 },
                        "saves": { "reflex": { "base": 2 } }
                    }
                }),
            )
            .unwrap();
        (kernel, book)
    }

    fn ioctl(kernel: &VfsKernel, code: DeviceRequest, arg: Value) -> KResult<Value> {
        let fd = kernel.open("/dev/combat", OpenMode::ReadWrite)?;
        let result = kernel.ioctl(fd, code.code(), arg);
        kernel.close(fd)?;
        result
    }

    fn arg() -> Value {
        json!({ "entityPath": "/entity/character/7" })
    }

    #[test]
    fn test_calc_combat_uses_config_bab() {
        let (kernel, _) = boot(CombatConfig { base_attack_bonus: 3 });
        let stats = ioctl(&kernel, DeviceRequest::CalcCombat, arg()).unwrap();
        assert_eq!(stats["ac"], 13);
        assert_eq!(stats["initiative"], 3);
        assert_eq!(stats["meleeAttack"], 5);
        assert_eq!(stats["rangedAttack"], 6);
        assert_eq!(stats["cmd"], 18);

        let fd = kernel.open("/entity/character/7", OpenMode::Read).unwrap();
        let doc = kernel.read(fd).unwrap();
        assert_eq!(doc["properties"]["combat"]["ac"], 13);
    }

    #[test]
    fn test_argument_bab_overrides_config() {
        let (kernel, _) = boot(CombatConfig { base_attack_bonus: 3 });
        let stats = ioctl(
            &kernel,
            DeviceRequest::Initialize,
            json!({ "entityPath": "/entity/character/7", "baseAttackBonus": 0 }),
        )
        .unwrap();
        assert_eq!(stats["meleeAttack"], 2);
    }

    #[test]
    fn test_flat_footed_drops_dex_to_ac() {
        let (kernel, book) = boot(CombatConfig::default());
        book.borrow_mut()
            .engine_mut("7")
            .register_numeric_effect("7", "ac", "armor", 4, Some("armor"), None);
        ioctl(
            &kernel,
            DeviceRequest::ApplyCondition,
            json!({ "entityPath": "/entity/character/7", "condition": "flat_footed" }),
        )
        .unwrap();
        let stats = ioctl(&kernel, DeviceRequest::CalcCombat, arg()).unwrap();
        assert_eq!(stats["ac"], 14);

        ioctl(
            &kernel,
            DeviceRequest::ApplyCondition,
            json!({ "entityPath": "/entity/character/7", "condition": "flat_footed", "active": false }),
        )
        .unwrap();
        let stats = ioctl(&kernel, DeviceRequest::CalcCombat, arg()).unwrap();
        assert_eq!(stats["ac"], 17);
        assert_eq!(book.borrow().engine("7").len(), 1);
    }

    #[test]
    fn test_saves_see_wildcard_effects() {
        let (kernel, book) = boot(CombatConfig::default());
        book.borrow_mut()
            .engine_mut("7")
            .register_numeric_effect("7", "saving_throw.*", "trait:lucky", 1, Some("luck"), None);
        let reflex = ioctl(
            &kernel,
            DeviceRequest::CalcSave,
            json!({ "entityPath": "/entity/character/7", "save": "reflex" }),
        )
        .unwrap();
        assert_eq!(reflex["total"], 6);

        let all = ioctl(&kernel, DeviceRequest::CalcSave, arg()).unwrap();
        assert_eq!(all["will"]["total"], 0);
        assert_eq!(all["fortitude"]["total"], 1);

        assert_eq!(
            ioctl(
                &kernel,
                DeviceRequest::CalcSave,
                json!({ "entityPath": "/entity/character/7", "save": "luck" })
            ),
            Err(Errno::EINVAL)
        );
    }

    #[test]
    fn test_read_requires_selection() {
        let (kernel, _) = boot(CombatConfig::default());
        let fd = kernel.open("/dev/combat", OpenMode::Read).unwrap();
        assert_eq!(kernel.read(fd), Err(Errno::EINVAL));
        ioctl(&kernel, DeviceRequest::SetCharacter, arg()).unwrap();
        assert_eq!(kernel.read(fd).unwrap()["initiative"], 3);
        kernel.close(fd).unwrap();
    }
}
