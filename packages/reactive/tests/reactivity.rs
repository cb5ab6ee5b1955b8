//! Behavior of the reactive graph: tracking, batching, cleanup and error
//! policy. Each test isolates itself in its own context.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use pulse_reactive::{
    batch, computed, computed_with, create_context, effect, effect_with_cleanup,
    effect_with_options, pulse, pulse_with_equals, untrack, with_context,
    ComputedOptions, EffectOptions, ReactiveVec, StateMap,
};

#[test]
fn counter_with_batch_runs_effect_twice_total() {
    let ctx = create_context("counter-batch");
    with_context(&ctx, || {
        let c = pulse(0);
        let d = computed({
            let c = c.clone();
            move || c.get() * 2
        });
        let runs = Rc::new(Cell::new(0));
        let _e = effect({
            let d = d.clone();
            let runs = runs.clone();
            move || {
                let _ = d.get();
                runs.set(runs.get() + 1);
            }
        });
        assert_eq!(runs.get(), 1);

        batch(|| {
            c.set(1);
            c.set(2);
            c.set(3);
        });

        assert_eq!(d.peek(), 6);
        assert_eq!(runs.get(), 2);
    });
    ctx.reset();
}

#[test]
fn equal_write_does_not_reschedule() {
    let ctx = create_context("equal-write");
    with_context(&ctx, || {
        let s = pulse(5);
        let runs = Rc::new(Cell::new(0));
        let _e = effect({
            let s = s.clone();
            let runs = runs.clone();
            move || {
                let _ = s.get();
                runs.set(runs.get() + 1);
            }
        });
        s.set(5);
        assert_eq!(runs.get(), 1);
        s.set(6);
        assert_eq!(runs.get(), 2);
    });
    ctx.reset();
}

#[test]
fn custom_equality_predicate_is_honored() {
    let ctx = create_context("custom-eq");
    with_context(&ctx, || {
        // case-insensitive equality
        let s = pulse_with_equals("Hello".to_string(), |a: &String, b: &String| {
            a.eq_ignore_ascii_case(b)
        });
        let runs = Rc::new(Cell::new(0));
        let _e = effect({
            let s = s.clone();
            let runs = runs.clone();
            move || {
                let _ = s.get();
                runs.set(runs.get() + 1);
            }
        });
        s.set("HELLO".to_string());
        assert_eq!(runs.get(), 1);
        s.set("world".to_string());
        assert_eq!(runs.get(), 2);
    });
    ctx.reset();
}

#[test]
fn computed_recomputes_at_most_once_per_flush() {
    let ctx = create_context("diamond");
    with_context(&ctx, || {
        let a = pulse(1);
        let computes = Rc::new(Cell::new(0));
        let b = computed({
            let a = a.clone();
            move || a.get() + 1
        });
        let c = computed({
            let a = a.clone();
            move || a.get() * 10
        });
        let d = computed({
            let b = b.clone();
            let c = c.clone();
            let computes = computes.clone();
            move || {
                computes.set(computes.get() + 1);
                b.get() + c.get()
            }
        });
        let seen = Rc::new(RefCell::new(Vec::new()));
        let _e = effect({
            let d = d.clone();
            let seen = seen.clone();
            move || seen.borrow_mut().push(d.get())
        });
        assert_eq!(computes.get(), 1);

        batch(|| {
            a.set(2);
            a.set(3);
        });

        // one recompute for the whole batch, and no glitch value observed
        assert_eq!(computes.get(), 2);
        assert_eq!(*seen.borrow(), vec![12, 34]);
    });
    ctx.reset();
}

#[test]
fn cleanup_runs_before_each_rerun_and_on_dispose() {
    let ctx = create_context("cleanup");
    with_context(&ctx, || {
        let s = pulse(0);
        let cleanups = Rc::new(Cell::new(0));
        let e = effect_with_cleanup({
            let s = s.clone();
            let cleanups = cleanups.clone();
            move || {
                let _ = s.get();
                let cleanups = cleanups.clone();
                move || cleanups.set(cleanups.get() + 1)
            }
        });
        s.set(1);
        s.set(2);
        assert_eq!(cleanups.get(), 2);
        e.dispose();
        assert_eq!(cleanups.get(), 3);
        // disposal is idempotent and the effect never runs again
        e.dispose();
        s.set(3);
        assert_eq!(cleanups.get(), 3);
    });
    ctx.reset();
}

#[test]
fn untrack_does_not_extend_dependencies() {
    let ctx = create_context("untrack");
    with_context(&ctx, || {
        let a = pulse(0);
        let b = pulse(0);
        let runs = Rc::new(Cell::new(0));
        let _e = effect({
            let a = a.clone();
            let b = b.clone();
            let runs = runs.clone();
            move || {
                let _ = a.get();
                let _ = untrack(|| b.get());
                runs.set(runs.get() + 1);
            }
        });
        b.set(7);
        assert_eq!(runs.get(), 1);
        a.set(1);
        assert_eq!(runs.get(), 2);
    });
    ctx.reset();
}

#[test]
fn subscribe_skips_the_current_value() {
    let ctx = create_context("subscribe");
    with_context(&ctx, || {
        let s = pulse(10);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sub = s.subscribe({
            let seen = seen.clone();
            move |v| seen.borrow_mut().push(*v)
        });
        assert!(seen.borrow().is_empty());
        s.set(11);
        s.set(12);
        assert_eq!(*seen.borrow(), vec![11, 12]);
        sub.dispose();
        s.set(13);
        assert_eq!(*seen.borrow(), vec![11, 12]);
    });
    ctx.reset();
}

#[test]
fn nested_batches_flush_at_the_outermost_boundary() {
    let ctx = create_context("nested-batch");
    with_context(&ctx, || {
        let s = pulse(0);
        let runs = Rc::new(Cell::new(0));
        let _e = effect({
            let s = s.clone();
            let runs = runs.clone();
            move || {
                let _ = s.get();
                runs.set(runs.get() + 1);
            }
        });
        batch(|| {
            s.set(1);
            batch(|| {
                s.set(2);
            });
            // inner batch must not flush
            assert_eq!(runs.get(), 1);
            s.set(3);
        });
        assert_eq!(runs.get(), 2);
        assert_eq!(s.peek(), 3);
    });
    ctx.reset();
}

#[test]
fn effect_panic_is_reported_and_flush_continues() {
    let ctx = create_context("effect-panic");
    with_context(&ctx, || {
        let s = pulse(0);
        let errors = Rc::new(RefCell::new(Vec::new()));
        let _bad = effect_with_options(
            {
                let s = s.clone();
                move || {
                    if s.get() > 0 {
                        panic!("boom");
                    }
                }
            },
            EffectOptions {
                on_error: Some(Rc::new({
                    let errors = errors.clone();
                    move |e| errors.borrow_mut().push(e.code())
                })),
            },
        );
        let observed = Rc::new(Cell::new(0));
        let _good = effect({
            let s = s.clone();
            let observed = observed.clone();
            move || observed.set(s.get())
        });

        s.set(1);

        assert_eq!(*errors.borrow(), vec!["REACTIVITY_ERROR"]);
        assert_eq!(observed.get(), 1);
    });
    ctx.reset();
}

#[test]
fn computed_panic_propagates_and_stays_dirty() {
    let ctx = create_context("computed-panic");
    with_context(&ctx, || {
        let explode = pulse(false);
        let c = computed({
            let explode = explode.clone();
            move || {
                if explode.get() {
                    panic!("computed boom");
                }
                41
            }
        });
        assert_eq!(c.get(), 41);

        explode.set(true);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| c.get()));
        assert!(result.is_err());

        // after the upstream recovers the compute retries
        explode.set(false);
        assert_eq!(c.get(), 41);
    });
    ctx.reset();
}

#[test]
fn circular_dependency_is_detected() {
    let ctx = create_context("circular");
    with_context(&ctx, || {
        let x = pulse(0i64);
        let y = pulse(0i64);
        let errors = Rc::new(RefCell::new(Vec::new()));
        let on_error = EffectOptions {
            on_error: Some(Rc::new({
                let errors = errors.clone();
                move |e| errors.borrow_mut().push(e.code())
            })),
        };
        let _a = effect_with_options(
            {
                let x = x.clone();
                let y = y.clone();
                move || {
                    let v = x.get();
                    y.set(v + 1);
                }
            },
            on_error,
        );
        let _b = effect({
            let x = x.clone();
            let y = y.clone();
            move || {
                let v = y.get();
                x.set(v + 1);
            }
        });

        assert!(errors.borrow().contains(&"CIRCULAR_DEPENDENCY"));
        // values settled; the scheduler did not hang
        assert!(x.peek() > 0);
    });
    ctx.reset();
}

#[test]
fn contexts_isolate_and_reset_tears_down() {
    let a = create_context("ctx-a");
    let b = create_context("ctx-b");
    let runs_a = Rc::new(Cell::new(0));
    let pulse_a = with_context(&a, || {
        let s = pulse(0);
        let _e = effect({
            let s = s.clone();
            let runs_a = runs_a.clone();
            move || {
                let _ = s.get();
                runs_a.set(runs_a.get() + 1);
            }
        });
        s
    });
    with_context(&b, || {
        let other = pulse(0);
        other.set(99);
    });
    assert_eq!(runs_a.get(), 1);

    pulse_a.set(1);
    assert_eq!(runs_a.get(), 2);

    a.reset();
    pulse_a.set(2);
    // the effect was torn down with its context
    assert_eq!(runs_a.get(), 2);
    // the handle still reads its last value
    assert_eq!(pulse_a.peek(), 2);
    b.reset();
}

#[test]
fn eager_computed_refreshes_without_readers() {
    let ctx = create_context("eager");
    with_context(&ctx, || {
        let s = pulse(1);
        let computes = Rc::new(Cell::new(0));
        let c = computed_with(
            {
                let s = s.clone();
                let computes = computes.clone();
                move || {
                    computes.set(computes.get() + 1);
                    s.get() * 2
                }
            },
            ComputedOptions {
                equals: None,
                lazy: false,
            },
        );
        assert_eq!(computes.get(), 1);
        s.set(2);
        assert_eq!(computes.get(), 2);
        assert_eq!(c.peek(), 4);
    });
    ctx.reset();
}

#[test]
fn reactive_vec_notifies_once_per_mutation_and_coalesces_in_batch() {
    let ctx = create_context("reactive-vec");
    with_context(&ctx, || {
        let items = ReactiveVec::new(vec![1, 2]);
        let runs = Rc::new(Cell::new(0));
        let _e = effect({
            let items = items.clone();
            let runs = runs.clone();
            move || {
                let _ = items.get();
                runs.set(runs.get() + 1);
            }
        });
        assert_eq!(runs.get(), 1);

        items.push(3);
        assert_eq!(runs.get(), 2);

        batch(|| {
            items.push(4);
            items.pop();
            items.reverse();
        });
        assert_eq!(runs.get(), 3);
        assert_eq!(items.with(|v| v.to_vec()), vec![3, 2, 1]);
    });
    ctx.reset();
}

#[test]
fn state_map_creates_cells_on_first_access() {
    let ctx = create_context("state-map");
    with_context(&ctx, || {
        let map: StateMap<i64> = StateMap::new();
        let seen = Rc::new(Cell::new(0));
        let _e = effect({
            let map = map.clone();
            let seen = seen.clone();
            move || seen.set(map.get("count"))
        });
        assert_eq!(seen.get(), 0);
        map.set("count", 42);
        assert_eq!(seen.get(), 42);
    });
    ctx.reset();
}

#[test]
fn on_cleanup_registrations_fire_in_reverse_order() {
    let ctx = create_context("cleanup-order");
    with_context(&ctx, || {
        let s = pulse(0);
        let order = Rc::new(RefCell::new(Vec::new()));
        let _e = effect({
            let s = s.clone();
            let order = order.clone();
            move || {
                let _ = s.get();
                let o1 = order.clone();
                pulse_reactive::on_cleanup(move || o1.borrow_mut().push("first"));
                let o2 = order.clone();
                pulse_reactive::on_cleanup(move || o2.borrow_mut().push("second"));
            }
        });
        s.set(1);
        assert_eq!(*order.borrow(), vec!["second", "first"]);
    });
    ctx.reset();
}
