//! End-to-end interaction scenarios across widget families

use std::time::Duration;

use aria_core::{Debouncer, Key, Modifiers};
use aria_dom::{el, ElementBuilder, NodeId, Selector};
use aria_widgets::prelude::*;
use aria_widgets::combobox::{BUTTON_TAG, LIST_TAG, OPTION_TAG};
use aria_widgets::menu::{ITEM_TAG, SUBMENU_TAG};
use aria_widgets::{ComboBoxValue, Timer, WidgetContext};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn node(cx: &WidgetContext, id: &str) -> NodeId {
    cx.doc().element_by_id(id).unwrap()
}

fn insert(cx: &mut WidgetContext, tree: ElementBuilder) -> NodeId {
    let body = cx.doc().root();
    cx.doc_mut().insert(body, tree).unwrap()
}

/// Number of elements under `scope` carrying the `focused` state
fn focused_count(cx: &WidgetContext, scope: NodeId) -> usize {
    let selector = Selector::parse("[focused]").unwrap();
    cx.doc().query_all(scope, &selector).len()
}

// ============================================================================
// Combo Box
// ============================================================================

#[test]
fn combobox_select_and_reopen() {
    init_tracing();
    let mut cx = WidgetContext::default();
    let root = insert(
        &mut cx,
        el("ui-combobox").children([
            el(BUTTON_TAG).id("trigger").attr("tabindex", "0"),
            el(LIST_TAG).children([
                el(OPTION_TAG).id("cat").attr("value", "cat").text("Cat"),
                el(OPTION_TAG).id("dog").attr("value", "dog").text("Dog"),
            ]),
        ]),
    );
    let id = cx.upgrade(root).unwrap();
    let (trigger, cat) = (node(&cx, "trigger"), node(&cx, "cat"));
    cx.focus(trigger);

    cx.press(Key::ArrowDown);
    let combo = cx.get::<ComboBox>(id).unwrap();
    assert!(combo.is_expanded());
    assert_eq!(combo.focused_option(), Some(cat));

    cx.press(Key::Enter);
    let combo = cx.get::<ComboBox>(id).unwrap();
    assert!(!combo.is_expanded());
    assert_eq!(combo.value(), ComboBoxValue::Single(Some("cat".to_string())));
    assert_eq!(cx.doc().active_element(), Some(trigger));

    cx.press(Key::ArrowDown);
    let combo = cx.get::<ComboBox>(id).unwrap();
    assert_eq!(combo.focused_option(), Some(cat));
    assert!(combo.is_selected(cx.doc(), cat));
    assert_eq!(cx.doc().attribute(cat, "aria-selected"), Some("true"));
    assert_eq!(focused_count(&cx, root), 1);
}

#[test]
fn detached_combobox_drops_pending_focus_loss() {
    init_tracing();
    let mut cx = WidgetContext::default();
    let root = insert(
        &mut cx,
        el("ui-combobox").children([
            el(BUTTON_TAG).id("trigger").attr("tabindex", "0"),
            el(LIST_TAG).child(el(OPTION_TAG).attr("value", "cat").text("Cat")),
        ]),
    );
    let outside = insert(&mut cx, el("button"));
    let id = cx.upgrade(root).unwrap();
    cx.focus(node(&cx, "trigger"));
    cx.press(Key::ArrowDown);
    assert!(cx.get::<ComboBox>(id).unwrap().is_expanded());

    cx.focus(outside);
    assert!(cx.is_scheduled(id, Timer::FocusLoss));
    cx.take_notifications();

    cx.remove(root).unwrap();
    assert!(cx.get::<ComboBox>(id).is_none());
    assert_eq!(cx.next_deadline(), None);
    cx.advance_by(Duration::from_secs(1));
    assert!(cx.take_notifications().is_empty());

    let nodes = cx.doc().node_count();
    cx.destroy(root).unwrap();
    assert!(!cx.doc().exists(root));
    assert_eq!(cx.doc().node_count(), nodes - 4);
}

// ============================================================================
// Menu
// ============================================================================

/// button > s0 [a > s1 [b > s2 [c], e], d]
fn nested_menu(cx: &mut WidgetContext) -> WidgetId {
    let item = |id: &str| el(ITEM_TAG).id(id).text(id);
    let root = insert(
        cx,
        el("ui-menu").id("menu").children([
            el("ui-menu-button").id("button"),
            el(SUBMENU_TAG).id("s0").children([
                item("a").child(el(SUBMENU_TAG).id("s1").children([
                    item("b").child(el(SUBMENU_TAG).id("s2").child(item("c"))),
                    item("e"),
                ])),
                item("d"),
            ]),
        ]),
    );
    cx.upgrade(root).unwrap()
}

fn expanded(cx: &WidgetContext, id: WidgetId, submenu: &str) -> bool {
    cx.get::<Menu>(id)
        .unwrap()
        .is_submenu_expanded(node(cx, submenu))
}

#[test]
fn menu_pointer_navigation_through_nested_submenus() {
    init_tracing();
    let mut cx = WidgetContext::default();
    let id = nested_menu(&mut cx);

    cx.click(node(&cx, "button"));
    assert!(expanded(&cx, id, "s0"));
    assert!(!expanded(&cx, id, "s1"));

    cx.hover(node(&cx, "a"));
    assert!(expanded(&cx, id, "s1"));
    cx.hover(node(&cx, "b"));
    assert!(expanded(&cx, id, "s2"));
    assert_eq!(cx.doc().active_element(), Some(node(&cx, "b")));

    // Pointer goes back out to the first level
    cx.unhover(node(&cx, "b"));
    cx.unhover(node(&cx, "a"));
    cx.hover(node(&cx, "d"));
    cx.advance_by(Duration::from_millis(300));

    assert!(expanded(&cx, id, "s0"));
    assert!(!expanded(&cx, id, "s1"));
    assert!(!expanded(&cx, id, "s2"));
    assert!(cx.get::<Menu>(id).unwrap().is_expanded());
    assert_eq!(cx.doc().active_element(), Some(node(&cx, "d")));
    assert_eq!(focused_count(&cx, node(&cx, "menu")), 1);
}

#[test]
fn menu_expansion_is_transitive() {
    init_tracing();
    let mut cx = WidgetContext::default();
    let id = nested_menu(&mut cx);
    let chain = ["s0", "s1", "s2"];

    for (depth, sub) in chain.iter().enumerate() {
        let target = node(&cx, sub);
        cx.with::<Menu, _>(id, |menu, wcx| menu.open_submenu(wcx, target));
        for ancestor in &chain[..=depth] {
            assert!(expanded(&cx, id, ancestor), "{ancestor} open while {sub} is");
            assert_eq!(cx.doc().attribute(node(&cx, ancestor), "hidden"), None);
        }
        assert_eq!(cx.doc().attribute(node(&cx, "button"), "aria-expanded"), Some("true"));
    }

    let s0 = node(&cx, "s0");
    cx.with::<Menu, _>(id, |menu, wcx| menu.close_submenu(wcx, s0));
    for sub in chain {
        assert!(!expanded(&cx, id, sub));
    }
}

// ============================================================================
// List Box
// ============================================================================

#[test]
fn listbox_ctrl_a_selects_then_clears_all() {
    init_tracing();
    let mut cx = WidgetContext::default();
    let root = insert(
        &mut cx,
        el("ui-listbox").attr("multiple", "").children(
            ["Red", "Green", "Blue"]
                .into_iter()
                .map(|label| el("ui-listbox-option").text(label)),
        ),
    );
    let id = cx.upgrade(root).unwrap();
    cx.focus(root);
    assert!(cx.get::<ListBox>(id).unwrap().value().is_empty());

    cx.press_with(Key::Character('a'), Modifiers::CTRL);
    assert_eq!(cx.get::<ListBox>(id).unwrap().value(), vec!["Red", "Green", "Blue"]);
    assert_eq!(cx.doc().attribute(root, "aria-multiselectable"), Some("true"));

    cx.press_with(Key::Character('a'), Modifiers::CTRL);
    assert!(cx.get::<ListBox>(id).unwrap().value().is_empty());
    assert_eq!(focused_count(&cx, root), 1);
}

#[test]
fn listbox_typeahead_wraps_before_focus() {
    init_tracing();
    let mut cx = WidgetContext::default();
    let root = insert(
        &mut cx,
        el("ui-listbox").children(
            ["Apple", "Banana", "Cherry"]
                .into_iter()
                .map(|label| el("ui-listbox-option").id(&label.to_lowercase()).text(label)),
        ),
    );
    let id = cx.mount(root, ListBoxConfig::default()).unwrap();
    cx.focus(root);
    cx.press(Key::End);
    assert_eq!(cx.get::<ListBox>(id).unwrap().focused_option(), Some(node(&cx, "cherry")));

    cx.press(Key::Character('a'));
    assert_eq!(cx.get::<ListBox>(id).unwrap().focused_option(), Some(node(&cx, "apple")));
    assert_eq!(focused_count(&cx, root), 1);
}

// ============================================================================
// Slider
// ============================================================================

#[test]
fn slider_keyboard_from_unset_value() {
    init_tracing();
    let mut cx = WidgetContext::default();
    let root = insert(
        &mut cx,
        el("ui-slider")
            .attr("min", "0")
            .attr("max", "100")
            .attr("step", "1")
            .child(el("ui-slider-thumb").id("thumb")),
    );
    let id = cx.upgrade(root).unwrap();
    let thumb = node(&cx, "thumb");
    cx.focus(thumb);

    cx.press(Key::ArrowRight);
    assert_eq!(cx.get::<Slider>(id).unwrap().value(), vec![1.0]);
    assert_eq!(cx.doc().attribute(thumb, "aria-valuenow"), Some("1"));
    cx.press(Key::End);
    assert_eq!(cx.get::<Slider>(id).unwrap().value(), vec![100.0]);
    cx.press(Key::Home);
    assert_eq!(cx.get::<Slider>(id).unwrap().value(), vec![0.0]);
}

#[test]
fn slider_thumbs_keep_min_distance() {
    init_tracing();
    let mut cx = WidgetContext::default();
    let root = insert(
        &mut cx,
        el("ui-slider").children([
            el("ui-slider-thumb").id("low").attr("value", "30"),
            el("ui-slider-thumb").id("high").attr("value", "50"),
        ]),
    );
    let id = cx
        .mount(root, SliderConfig::default().disable_swap(15.0))
        .unwrap();
    let gap = |cx: &WidgetContext| {
        let values = cx.get::<Slider>(id).unwrap().value();
        values[1] - values[0]
    };

    cx.focus(node(&cx, "low"));
    for _ in 0..10 {
        cx.press(Key::ArrowRight);
        assert!(gap(&cx) >= 15.0);
    }
    cx.press(Key::PageUp);
    cx.press(Key::End);
    assert!(gap(&cx) >= 15.0);

    cx.focus(node(&cx, "high"));
    cx.press(Key::Home);
    cx.press(Key::PageDown);
    assert!(gap(&cx) >= 15.0);
    assert_eq!(cx.get::<Slider>(id).unwrap().value(), vec![35.0, 50.0]);
}

// ============================================================================
// Dialog, Carousel and Tooltip
// ============================================================================

#[test]
fn dialog_traps_and_restores_focus() {
    init_tracing();
    let mut cx = WidgetContext::default();
    let opener = insert(&mut cx, el("button").id("opener"));
    let root = insert(
        &mut cx,
        el("ui-dialog").attr("hidden", "").children([
            el("button").id("ok"),
            el("button").id("cancel"),
        ]),
    );
    let id = cx.upgrade(root).unwrap();
    cx.focus(opener);

    cx.with::<Dialog, _>(id, |dialog, wcx| dialog.expand(wcx));
    assert_eq!(cx.doc().active_element(), Some(node(&cx, "ok")));
    cx.press(Key::Tab);
    cx.press(Key::Tab);
    assert_eq!(cx.doc().active_element(), Some(node(&cx, "ok")));

    cx.press(Key::Escape);
    assert!(!cx.get::<Dialog>(id).unwrap().is_expanded());
    assert_eq!(cx.doc().active_element(), Some(opener));
}

#[test]
fn upgrade_all_mounts_every_family() {
    init_tracing();
    let mut cx = WidgetContext::default();
    insert(
        &mut cx,
        el("div").children([
            el("ui-carousel").child(el("ui-carousel-slide")),
            el("ui-tooltip").children([
                el("ui-tooltip-trigger"),
                el("ui-tooltip-content").text("Hint"),
            ]),
            el("ui-menubar").child(el(ITEM_TAG).text("File")),
            el("unknown-element"),
        ]),
    );
    let mounted = cx.upgrade_all();
    assert_eq!(mounted.len(), 3);
    assert!(cx.get::<Carousel>(mounted[0]).is_some());
    assert!(cx.get::<Tooltip>(mounted[1]).is_some());
    assert!(cx.get::<Menu>(mounted[2]).unwrap().config().menubar);
    assert!(cx.upgrade_all().is_empty());
}

// ============================================================================
// Timing and Configuration
// ============================================================================

#[test]
fn debounce_keeps_only_the_latest_action() {
    let mut debouncer = Debouncer::new();
    let delay = Duration::from_millis(200);
    assert_eq!(debouncer.schedule("collapse", 1, 0, delay), None);
    assert_eq!(debouncer.schedule("collapse", 2, 150, delay), Some(1));

    assert!(debouncer.poll(200).is_empty());
    assert_eq!(debouncer.poll(350), vec![("collapse", 2)]);
    assert!(debouncer.is_empty());
}

#[test]
fn configs_deserialize_with_defaults() {
    let config: ComboBoxConfig =
        serde_json::from_str(r#"{"autocomplete":"both","collapse_debounce":150}"#).unwrap();
    assert_eq!(config.autocomplete, Autocomplete::Both);
    assert_eq!(config.collapse_debounce, Duration::from_millis(150));
    assert!(!config.multiple);

    let config: SliderConfig =
        serde_json::from_str(r#"{"max":10,"step":0.5,"orientation":"vertical"}"#).unwrap();
    assert_eq!(config.min, 0.0);
    assert_eq!(config.max, 10.0);
    assert_eq!(config.orientation, Orientation::Vertical);

    let config: TooltipConfig = serde_json::from_str(r#"{"placement":"bottom-start"}"#).unwrap();
    assert_eq!(config.placement, Placement::BottomStart);
    assert_eq!(config.show_delay, Duration::from_millis(300));
}
