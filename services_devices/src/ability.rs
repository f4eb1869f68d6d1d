//! Ability score device

use crate::abilities::{is_ability, AbilityScore, ABILITIES};
use crate::entity::{i64_field, load, raw_number, store, Selection, Target};
use core_types::document::{self, PROPERTIES};
use core_types::{DeviceRequest, Errno, KResult};
use kernel_api::{Capability, IoRequest, KernelRef};
use log::{debug, error};
use serde_json::{json, Map, Value};
use services_effects::{saturating_sum, EffectBook};
use std::cell::RefCell;
use std::rc::Rc;

/// Computes ability modifiers and skill totals
///
/// `INITIALIZE` writes `properties.abilities.{name}` as
/// `{ base, bonus, total, modifier }` for all six abilities.
pub struct AbilityDevice {
    kernel: KernelRef,
    effects: Rc<RefCell<EffectBook>>,
    selection: Selection,
    debug: bool,
}

impl AbilityDevice {
    pub fn new(kernel: KernelRef, effects: Rc<RefCell<EffectBook>>) -> Self {
        Self {
            kernel,
            effects,
            selection: Selection::default(),
            debug: false,
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    fn scores(&self, target: &Target, doc: &Value) -> Map<String, Value> {
        let book = self.effects.borrow();
        let engine = book.engine(&target.id);
        ABILITIES
            .iter()
            .map(|name| {
                let score = AbilityScore::resolve(doc, engine, name);
                (name.to_string(), json!(score))
            })
            .collect()
    }

    fn initialize(&self, arg: &Value) -> KResult<Value> {
        let target = self.selection.target(arg)?;
        let mut doc = load(&self.kernel, &target.path)?;
        let scores = self.scores(&target, &doc);
        let now = self.kernel.get()?.now().as_millis();

        document::properties_mut(&mut doc)?.insert("abilities".to_string(), Value::Object(scores.clone()));
        document::touch(&mut doc, now)?;
        store(&self.kernel, &target.path, doc)?;
        Ok(Value::Object(scores))
    }

    fn calc_ability(&self, arg: &Value) -> KResult<Value> {
        let target = self.selection.target(arg)?;
        let doc = load(&self.kernel, &target.path)?;
        match document::str_field(arg, "ability") {
            None => Ok(Value::Object(self.scores(&target, &doc))),
            Some(name) if is_ability(name) => {
                let book = self.effects.borrow();
                Ok(json!(AbilityScore::resolve(&doc, book.engine(&target.id), name)))
            }
            Some(_) => Err(Errno::EINVAL),
        }
    }

    /// `ranks + modifier(ability) + effects(skill.{name})`
    fn calc_skill(&self, arg: &Value) -> KResult<Value> {
        let target = self.selection.target(arg)?;
        let skill = document::require_str(arg, "skill")?;
        let doc = load(&self.kernel, &target.path)?;

        let stored = doc.get(PROPERTIES).and_then(|p| p.get("skills")).and_then(|s| s.get(skill));
        let ability = document::str_field(arg, "ability")
            .or_else(|| stored.and_then(|s| document::str_field(s, "ability")))
            .ok_or(Errno::EINVAL)?;
        if !is_ability(ability) {
            return Err(Errno::EINVAL);
        }
        let ranks = i64_field(arg, "ranks")
            .or_else(|| stored.and_then(|s| i64_field(s, "ranks").or_else(|| s.as_i64())))
            .unwrap_or(0);

        let book = self.effects.borrow();
        let engine = book.engine(&target.id);
        let ability_modifier = AbilityScore::resolve(&doc, engine, ability).modifier;
        let bonus = engine
            .apply_numeric_effects(&format!("skill.{}", skill), None)
            .total;
        Ok(json!({
            "skill": skill,
            "ability": ability,
            "ranks": ranks,
            "abilityModifier": ability_modifier,
            "bonus": bonus,
            "total": saturating_sum([ranks, ability_modifier, bonus]),
        }))
    }

    fn apply_bonus(&self, arg: &Value) -> KResult<Value> {
        let target = self.selection.target(arg)?;
        let stat = document::require_str(arg, "target")?;
        let source = document::require_str(arg, "source")?;
        let value = i64_field(arg, "value").ok_or(Errno::EINVAL)?;
        let id = self.effects.borrow_mut().engine_mut(&target.id).register_numeric_effect(
            &target.id,
            stat,
            source,
            value,
            document::str_field(arg, "type"),
            document::str_field(arg, "id"),
        );
        Ok(json!({ "id": id }))
    }
}

impl Capability for AbilityDevice {
    fn id(&self) -> &str {
        "ability"
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

    /// Reads the selected entity's stored abilities, or raw scores when
    /// not initialized
    fn read(&self, _request: &IoRequest) -> KResult<Value> {
        let target = self.selection.target(&Value::Null)?;
        let doc = load(&self.kernel, &target.path)?;
        if let Some(stored) = doc.get(PROPERTIES).and_then(|p| p.get("abilities")) {
            return Ok(stored.clone());
        }
        let raw: Map<String, Value> = ABILITIES
            .iter()
            .filter_map(|name| raw_number(&doc, name).map(|n| (name.to_string(), Value::from(n))))
            .collect();
        Ok(Value::Object(raw))
    }

    fn ioctl(&self, request: &IoRequest, code: u32, arg: Value) -> KResult<Value> {
        if self.debug {
            debug!("ability: ioctl {} on {}", code, request.path);
        }
        let result = match DeviceRequest::from_code(code) {
            Some(DeviceRequest::Initialize) => self.initialize(&arg),
            Some(DeviceRequest::SetCharacter) => self.selection.select(&arg),
            Some(DeviceRequest::CalcAbility) => self.calc_ability(&arg),
            Some(DeviceRequest::CalcSkill) => self.calc_skill(&arg),
            Some(DeviceRequest::ApplyBonus) => self.apply_bonus(&arg),
            _ => Err(Errno::EINVAL),
        };
        if let Err(Errno::EIO) = result {
            error!("ability: ioctl {} failed: {}", code, Errno::EIO);
        }
        result
    }
}
