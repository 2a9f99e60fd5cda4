//! Blueprint installation, rollback and removal.


use herald_hooks::prelude::*;
use test_utils::CallLog;

#[test]
fn installed_blueprint_handlers_run() {
    let log = CallLog::new();
    let mut blueprint = Blueprint::new();
    blueprint
        .register("ready", log.recorder("first"), RegisterOptions::new())
        .register("ready", log.recorder("second"), RegisterOptions::new().priority(1));

    let registry = Registry::new();
    blueprint.install(&registry, Some("plugin")).unwrap();
    registry.trigger("plugin.ready", Args::new()).unwrap();
    assert_eq!(log.entries(), vec!["second", "first"]);

    assert_eq!(blueprint.uninstall(&registry).unwrap(), 2);
    log.clear();
    registry.trigger("plugin.ready", Args::new()).unwrap();
    assert!(log.is_empty());
}

#[test]
fn failed_install_rolls_back() {
    let registry = Registry::new();
    registry.define("strict.known", HookDefinition::new()).unwrap();
    registry.set_strict("strict", true).unwrap();

    let log = CallLog::new();
    let mut blueprint = Blueprint::new();
    blueprint
        .register("known", log.recorder("known"), RegisterOptions::new())
        .register("unknown", log.recorder("unknown"), RegisterOptions::new());

    let err = blueprint.install(&registry, Some("strict")).unwrap_err();
    assert_eq!(err, RegistryError::UndefinedHook("strict.unknown".into()));
    assert!(registry.registrations("strict.known").is_empty());

    registry.define("strict.unknown", HookDefinition::new()).unwrap();
    blueprint.install(&registry, Some("strict")).unwrap();
    assert_eq!(registry.registrations("strict.known").len(), 1);
    assert_eq!(registry.registrations("strict.unknown").len(), 1);
}

#[test]
fn blueprints_install_independently() {
    let registry = Registry::new();
    let log = CallLog::new();
    let mut first = Blueprint::new();
    first.register("h", log.recorder("first"), RegisterOptions::new());
    let mut second = Blueprint::new();
    second.register("h", log.recorder("second"), RegisterOptions::new());

    first.install(&registry, None).unwrap();
    second.install(&registry, None).unwrap();
    first.install(&registry, Some("copy")).unwrap();

    assert_eq!(first.uninstall(&registry).unwrap(), 2);
    registry.trigger("h", Args::new()).unwrap();
    assert_eq!(log.entries(), vec!["second"]);
    assert_eq!(second.uninstall(&registry).unwrap(), 1);
    assert_eq!(first.uninstall(&registry).unwrap(), 0);
}
