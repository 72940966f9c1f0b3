//! # promissory
//! One-shot promise/future pair for Rust with push-based continuation dispatch.
//!
//! A [`Promise`] publishes a single [`Try`] (a value or a captured failure), the
//! paired [`Future`] registers a single continuation. Whichever side finishes the
//! handshake last runs the continuation on its own thread, or hands it to an
//! installed [`Executor`]. Fan-in combinators ([`all_of`], [`any_of`], [`join2`]
//! and friends, [`all_of_run`]) collect many futures into one.
//!
//! ## Simple Example
//! ```rust
//! use std::sync::mpsc;
//! use std::thread;
//! use promissory::pair;
//!
//! fn main() {
//!     let (promise, future) = pair::<i32>();
//!
//!     thread::spawn(move || {
//!         // Do some background task here, eventually publish the result.
//!         // The continuation below runs right here, on this thread.
//!         promise.set_value(12345).ok();
//!     });
//!
//!     let (tx, rx) = mpsc::channel();
//!     future
//!         .then_run(move |t| {
//!             tx.send(t.unwrap()).ok();
//!         })
//!         .unwrap();
//!
//!     assert_eq!(rx.recv().unwrap(), 12345);
//! }
//! ```
#![deny(clippy::correctness)]
#![deny(
    clippy::perf,
    clippy::complexity,
    clippy::style,
    clippy::clone_on_ref_ptr,
    clippy::unwrap_used,
    clippy::used_underscore_binding
)]
use defer_heavy::defer;
use parking_lot::{Condvar, MappedMutexGuard, Mutex, MutexGuard};
use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::mem;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::Ordering::SeqCst;
use std::sync::atomic::{AtomicBool, AtomicUsize};
use std::thread;
use std::time::{Duration, Instant};

/// The outcome a producer publishes: a value or a captured failure.
///
/// A `Try` moves through the pipeline by value; combinators never unwrap it, so
/// individual failures travel inside their slot instead of aborting aggregates.
#[derive(Debug)]
pub enum Try<T> {
    Value(T),
    Error(Failure),
}

impl<T> Try<T> {
    /// Wrap an error into a failure `Try`.
    pub fn from_error(error: impl Error + Send + 'static) -> Self {
        Try::Error(Failure::new(error))
    }

    /// True if this `Try` carries a value.
    #[must_use]
    pub fn has_value(&self) -> bool {
        matches!(self, Try::Value(_))
    }

    /// True if this `Try` carries a failure.
    #[must_use]
    pub fn has_error(&self) -> bool {
        matches!(self, Try::Error(_))
    }

    /// # Panics
    /// if this `Try` carries a failure.
    #[must_use]
    pub fn unwrap(self) -> T {
        match self {
            Try::Value(v) => v,
            Try::Error(failure) => panic!("unwrap called on a failure Try: {failure}"),
        }
    }

    #[must_use]
    pub fn ok(self) -> Option<T> {
        match self {
            Try::Value(v) => Some(v),
            Try::Error(_) => None,
        }
    }

    #[must_use]
    pub fn err(self) -> Option<Failure> {
        match self {
            Try::Value(_) => None,
            Try::Error(failure) => Some(failure),
        }
    }

    #[must_use]
    pub fn as_value(&self) -> Option<&T> {
        match self {
            Try::Value(v) => Some(v),
            Try::Error(_) => None,
        }
    }

    pub fn map<X>(self, func: impl FnOnce(T) -> X) -> Try<X> {
        match self {
            Try::Value(v) => Try::Value(func(v)),
            Try::Error(failure) => Try::Error(failure),
        }
    }

    pub fn into_result(self) -> Result<T, Failure> {
        match self {
            Try::Value(v) => Ok(v),
            Try::Error(failure) => Err(failure),
        }
    }
}

/// Opaque error token carried by a failure [`Try`].
#[derive(Debug)]
pub struct Failure(Box<dyn Error + Send + 'static>);

impl Failure {
    pub fn new(error: impl Error + Send + 'static) -> Self {
        Failure(Box::new(error))
    }

    /// True if the captured error is of type `E`.
    #[must_use]
    pub fn is<E: Error + 'static>(&self) -> bool {
        let inner: &(dyn Error + 'static) = &*self.0;
        inner.is::<E>()
    }

    #[must_use]
    pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
        let inner: &(dyn Error + 'static) = &*self.0;
        inner.downcast_ref::<E>()
    }
}

impl Display for Failure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl Error for Failure {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        let inner: &(dyn Error + 'static) = &*self.0;
        Some(inner)
    }
}

/// Auto-installed failure when a producer drops its [`Promise`] without publishing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BrokenPromise;

impl Display for BrokenPromise {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("promise abandoned before a result was published")
    }
}

impl Error for BrokenPromise {}

/// Protocol misuse surfaced synchronously to the misusing caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateError {
    /// No result has been published yet.
    NotReady,
    /// The result was already moved into the continuation.
    Taken,
    /// A continuation was already registered.
    CallbackAlreadySet,
}

impl Display for StateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StateError::NotReady => f.write_str("no result has been published yet"),
            StateError::Taken => f.write_str("the result was already consumed by the continuation"),
            StateError::CallbackAlreadySet => f.write_str("a continuation was already registered"),
        }
    }
}

impl Error for StateError {}

/// Returned when publishing to an already published promise; hands the rejected
/// [`Try`] back to the caller.
#[derive(Debug)]
pub struct SetError<T>(pub Try<T>);

impl<T> Display for SetError<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("a result was already published")
    }
}

impl<T: Debug> Error for SetError<T> {}

/// A registered continuation. Consumed by the dispatch decision, invoked outside it.
type Callback<T> = Box<dyn FnOnce(Try<T>) + Send + 'static>;

/// The result side of the handshake.
#[derive(Debug)]
enum ResultCell<T> {
    Empty,
    Full(Try<T>),
    Consumed,
}

impl<T> ResultCell<T> {
    fn is_full(&self) -> bool {
        matches!(self, ResultCell::Full(_))
    }

    fn take(&mut self) -> Option<Try<T>> {
        match mem::replace(self, ResultCell::Consumed) {
            ResultCell::Full(t) => Some(t),
            other => {
                *self = other;
                None
            }
        }
    }
}

/// The continuation side of the handshake.
enum CallbackCell<T> {
    Empty,
    Armed(Callback<T>),
    Consumed,
}

impl<T> Debug for CallbackCell<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CallbackCell::Empty => f.write_str("Empty"),
            CallbackCell::Armed(_) => f.write_str("Armed"),
            CallbackCell::Consumed => f.write_str("Consumed"),
        }
    }
}

impl<T> CallbackCell<T> {
    fn is_armed(&self) -> bool {
        matches!(self, CallbackCell::Armed(_))
    }

    fn take(&mut self) -> Option<Callback<T>> {
        match mem::replace(self, CallbackCell::Consumed) {
            CallbackCell::Armed(func) => Some(func),
            other => {
                *self = other;
                None
            }
        }
    }
}

/// Everything the dispatch decision reads and writes, under one mutex.
struct CoreState<T> {
    result: ResultCell<T>,
    callback: CallbackCell<T>,
    called_back: bool,
    detached: u8,
    active: bool,
    executor: Option<Arc<dyn Executor>>,
}

/// The shared state object jointly owned by a [`Promise`] and a [`Future`].
struct Core<T: Send + 'static> {
    /// Monotonic "a result was published at some point". Lets `ready` answer
    /// without the lock and gives the blocking accessors a fast path.
    published: AtomicBool,
    state: Mutex<CoreState<T>>,
    ready_cond: Condvar,
}

impl<T: Send + 'static> Core<T> {
    fn new() -> Self {
        Core {
            published: AtomicBool::new(false),
            state: Mutex::new(CoreState {
                result: ResultCell::Empty,
                callback: CallbackCell::Empty,
                called_back: false,
                detached: 0,
                active: true,
                executor: None,
            }),
            ready_cond: Condvar::new(),
        }
    }

    fn set_result(&self, t: Try<T>) -> Result<(), SetError<T>> {
        {
            let mut state = self.state.lock();
            if !matches!(state.result, ResultCell::Empty) {
                return Err(SetError(t));
            }
            state.result = ResultCell::Full(t);
            //Under the lock, so a waiter that observed false cannot miss the wakeup.
            self.published.store(true, SeqCst);
        }
        self.ready_cond.notify_all();
        self.maybe_callback();
        Ok(())
    }

    fn set_callback(&self, func: Callback<T>) -> Result<(), StateError> {
        {
            let mut state = self.state.lock();
            if !matches!(state.callback, CallbackCell::Empty) {
                return Err(StateError::CallbackAlreadySet);
            }
            state.callback = CallbackCell::Armed(func);
        }
        self.maybe_callback();
        Ok(())
    }

    fn ready(&self) -> bool {
        self.published.load(SeqCst)
    }

    fn get_try(&self) -> Result<MappedMutexGuard<'_, Try<T>>, StateError> {
        let state = self.state.lock();
        match &state.result {
            ResultCell::Empty => Err(StateError::NotReady),
            ResultCell::Consumed => Err(StateError::Taken),
            ResultCell::Full(_) => Ok(MutexGuard::map(state, |s| {
                let ResultCell::Full(t) = &mut s.result else {
                    //We hold the lock the entire time and just observed Full.
                    unreachable!()
                };
                t
            })),
        }
    }

    fn activate(&self) {
        {
            self.state.lock().active = true;
        }
        self.maybe_callback();
    }

    fn deactivate(&self) {
        self.state.lock().active = false;
    }

    fn is_active(&self) -> bool {
        self.state.lock().active
    }

    fn set_executor(&self, executor: Arc<dyn Executor>) {
        //If the dispatch decision already fired this is simply irrelevant.
        self.state.lock().executor = Some(executor);
    }

    fn wait(&self) {
        if self.published.load(SeqCst) {
            return;
        }
        let mut state = self.state.lock();
        while !self.published.load(SeqCst) {
            self.ready_cond.wait(&mut state);
        }
    }

    fn wait_until(&self, until: Instant) -> bool {
        if self.published.load(SeqCst) {
            return true;
        }
        let mut state = self.state.lock();
        while !self.published.load(SeqCst) {
            if self.ready_cond.wait_until(&mut state, until).timed_out() {
                return self.published.load(SeqCst);
            }
        }
        true
    }

    /// The dispatch rule. Fires the continuation exactly once, as soon as the
    /// result is published, a continuation is armed and the core is active.
    fn maybe_callback(&self) {
        let mut state = self.state.lock();
        if state.called_back
            || !state.result.is_full()
            || !state.callback.is_armed()
            || !state.active
        {
            return;
        }
        state.called_back = true;
        let (t, func) = match (state.result.take(), state.callback.take()) {
            (Some(t), Some(func)) => (t, func),
            //Both cells were observed occupied under this very lock.
            _ => unreachable!(),
        };
        let executor = state.executor.take();
        drop(state);
        match executor {
            //The task owns the moved result and continuation and never touches
            //the core again, so core destruction may precede the task running.
            Some(executor) => executor.add(Box::new(move || func(t))),
            None => func(t),
        }
    }

    /// Consumer-side detach, from `Future::drop`.
    fn detach_future(&self) {
        //The detach increment must survive a panicking continuation below.
        defer! {
            self.detach_one();
        }
        let register = matches!(self.state.lock().callback, CallbackCell::Empty);
        if register {
            //Only the consumer handle registers continuations and it is being
            //dropped right now, so this cannot race another registration.
            let _ = self.set_callback(Box::new(|_| {}));
        }
        self.activate();
    }

    /// Producer-side detach, from `Promise::drop`.
    fn detach_promise(&self) {
        defer! {
            self.detach_one();
        }
        let abandoned = matches!(self.state.lock().result, ResultCell::Empty);
        if abandoned {
            let _ = self.set_result(Try::Error(Failure::new(BrokenPromise)));
        }
    }

    fn detach_one(&self) {
        let mut state = self.state.lock();
        state.detached += 1;
        debug_assert!(state.detached <= 2, "more than two detaches on one core");
        if state.detached == 2 {
            //Whichever side detached last forced both cells occupied and the
            //core active first, so the dispatch decision has been made by now.
            debug_assert!(
                state.called_back,
                "core dropped before its continuation was scheduled"
            );
        }
    }
}

/// The producer handle: publishes exactly one [`Try`] into the shared core.
///
/// Dropping a `Promise` that never published installs a [`BrokenPromise`]
/// failure so the consumer side observes abandonment instead of silence.
pub struct Promise<T: Send + 'static> {
    core: Arc<Core<T>>,
}

impl<T: Send + 'static> Promise<T> {
    /// Publish a success value.
    ///
    /// If a continuation is already armed (and the core active), it runs on the
    /// current thread before this returns, unless an executor is installed.
    ///
    /// # Errors
    /// [`SetError`] carrying the value back if a result was already published.
    pub fn set_value(&self, value: T) -> Result<(), SetError<T>> {
        self.core.set_result(Try::Value(value))
    }

    /// Publish a captured failure.
    ///
    /// # Errors
    /// [`SetError`] carrying the failure back if a result was already published.
    pub fn set_error(&self, error: impl Error + Send + 'static) -> Result<(), SetError<T>> {
        self.core.set_result(Try::from_error(error))
    }

    /// Publish an outcome, success or failure.
    ///
    /// # Errors
    /// [`SetError`] carrying `t` back if a result was already published.
    pub fn set_try(&self, t: Try<T>) -> Result<(), SetError<T>> {
        self.core.set_result(t)
    }

    /// True if a result was published.
    #[must_use]
    pub fn ready(&self) -> bool {
        self.core.ready()
    }
}

impl<T: Send + 'static> Debug for Promise<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Promise")
            .field("published", &self.ready())
            .finish()
    }
}

impl<T: Send + 'static> Drop for Promise<T> {
    fn drop(&mut self) {
        self.core.detach_promise();
    }
}

/// Borrow of a published [`Try`], handed out by [`Future::get_try`].
///
/// The borrow holds the core's mutex. Release it promptly: publishing,
/// registering or detaching from another thread blocks while it is alive, and
/// calling back into the same core from the owning thread deadlocks.
pub struct TryGuard<'a, T: Send + 'static>(MappedMutexGuard<'a, Try<T>>);

impl<T: Send + 'static> Deref for TryGuard<'_, T> {
    type Target = Try<T>;

    fn deref(&self) -> &Self::Target {
        self.0.deref()
    }
}

impl<T: Send + Debug + 'static> Debug for TryGuard<'_, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(self.0.deref(), f)
    }
}

/// The consumer handle: registers the continuation, steers activation and
/// executor choice, and offers blocking accessors for thread-style consumers.
///
/// Dropping a `Future` with no continuation registers a no-op one and forces
/// the core active, so the producer's result is always consumed eventually.
pub struct Future<T: Send + 'static> {
    core: Arc<Core<T>>,
}

impl<T: Send + 'static> Future<T> {
    /// A future that is already completed with the given outcome.
    #[must_use]
    pub fn completed(t: Try<T>) -> Self {
        let (promise, future) = pair();
        //The pair is fresh, the publication cannot be refused.
        let _ = promise.set_try(t);
        future
    }

    /// Register the continuation. It runs exactly once, with the published
    /// [`Try`], as soon as the result is present and the core is active,
    /// possibly on the current thread before this returns.
    ///
    /// # Errors
    /// [`StateError::CallbackAlreadySet`] if a continuation was already registered.
    pub fn then_run(&self, func: impl FnOnce(Try<T>) + Send + 'static) -> Result<(), StateError> {
        self.core.set_callback(Box::new(func))
    }

    /// True once a result was published. Stable: stays true after the
    /// continuation consumed the value.
    #[must_use]
    pub fn ready(&self) -> bool {
        self.core.ready()
    }

    /// Borrow the published outcome without blocking.
    ///
    /// # Errors
    /// - [`StateError::NotReady`] if nothing was published yet.
    /// - [`StateError::Taken`] if the continuation already consumed the result.
    pub fn get_try(&self) -> Result<TryGuard<'_, T>, StateError> {
        self.core.get_try().map(TryGuard)
    }

    /// Block the current thread until a result is published.
    pub fn wait(&self) {
        self.core.wait();
    }

    /// Block roughly for the given duration waiting for a result.
    ///
    /// # Returns
    /// true if a result was published, false if the wait timed out first.
    #[must_use]
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        if timeout.is_zero() {
            return self.ready();
        }
        self.core.wait_until(Instant::now() + timeout)
    }

    /// Allow continuation dispatch again and re-run the dispatch rule.
    pub fn activate(&self) {
        self.core.activate();
    }

    /// Withhold continuation dispatch until [`Future::activate`] is called.
    /// The producer still publishes; the continuation simply does not run yet.
    pub fn deactivate(&self) {
        self.core.deactivate();
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.core.is_active()
    }

    /// Route the continuation through `executor` instead of running it inline
    /// on the publishing thread. Irrelevant if dispatch already fired.
    pub fn set_executor(&self, executor: Arc<dyn Executor>) {
        self.core.set_executor(executor);
    }
}

impl<T: Send + 'static> Debug for Future<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Future")
            .field("published", &self.ready())
            .field("active", &self.is_active())
            .finish()
    }
}

impl<T: Send + 'static> Drop for Future<T> {
    fn drop(&mut self) {
        self.core.detach_future();
    }
}

/// Create a connected [`Promise`]/[`Future`] pair sharing one core.
#[must_use]
pub fn pair<T: Send + 'static>() -> (Promise<T>, Future<T>) {
    let core = Arc::new(Core::new());
    (
        Promise {
            core: Arc::clone(&core),
        },
        Future { core },
    )
}

/// Shared collection state of [`all_of`].
struct AllOfContext<T: Send + 'static> {
    slots: Mutex<Vec<Option<Try<T>>>>,
    arrived: AtomicUsize,
    total: usize,
    promise: Promise<Vec<Try<T>>>,
}

impl<T: Send + 'static> AllOfContext<T> {
    fn arrive(&self, index: usize, t: Try<T>) {
        self.slots.lock()[index] = Some(t);
        if self.arrived.fetch_add(1, SeqCst) + 1 == self.total {
            let mut slots = self.slots.lock();
            let collected: Vec<Try<T>> = slots
                .iter_mut()
                .map(|slot| match slot.take() {
                    Some(t) => t,
                    //Every slot was written before the final arrival bumped the counter.
                    None => unreachable!(),
                })
                .collect();
            drop(slots);
            let _ = self.promise.set_try(Try::Value(collected));
        }
    }
}

/// Collects all futures into one future of a vector, ordered by input position
/// regardless of completion order.
///
/// Individual failures stay inside their slot; the aggregate itself always
/// completes. An empty input completes immediately with an empty vector.
#[must_use]
pub fn all_of<T: Send + 'static>(futures: Vec<Future<T>>) -> Future<Vec<Try<T>>> {
    let (promise, future) = pair();
    let total = futures.len();
    if total == 0 {
        let _ = promise.set_value(Vec::new());
        return future;
    }
    let ctx = Arc::new(AllOfContext {
        slots: Mutex::new((0..total).map(|_| None).collect()),
        arrived: AtomicUsize::new(0),
        total,
        promise,
    });
    for (index, fut) in futures.into_iter().enumerate() {
        let slot_ctx = Arc::clone(&ctx);
        let refused = fut.then_run(move |t| slot_ctx.arrive(index, t));
        if let Err(err) = refused {
            //A child with a foreign continuation can never report; record the
            //refusal in its slot so the aggregate still completes.
            ctx.arrive(index, Try::from_error(err));
        }
    }
    future
}

/// Shared state of [`any_of`]. Freed only after every child fired, because each
/// child continuation holds one strong reference.
struct AnyOfContext<T: Send + 'static> {
    done: AtomicBool,
    promise: Promise<(usize, Try<T>)>,
}

impl<T: Send + 'static> AnyOfContext<T> {
    fn arrive(&self, index: usize, t: Try<T>) {
        if !self.done.swap(true, SeqCst) {
            let _ = self.promise.set_try(Try::Value((index, t)));
        }
    }
}

/// Completes with the input position and outcome of whichever future completes
/// first. Later completions are observed and discarded.
///
/// An empty input yields a future that fails with [`BrokenPromise`].
#[must_use]
pub fn any_of<T: Send + 'static>(futures: Vec<Future<T>>) -> Future<(usize, Try<T>)> {
    let (promise, future) = pair();
    if futures.is_empty() {
        //No index can ever exist; dropping the promise surfaces abandonment.
        return future;
    }
    let ctx = Arc::new(AnyOfContext {
        done: AtomicBool::new(false),
        promise,
    });
    for (index, fut) in futures.into_iter().enumerate() {
        let slot_ctx = Arc::clone(&ctx);
        //A refused child can never win the race; the context is freed once the
        //remaining children fired.
        let _ = fut.then_run(move |t| slot_ctx.arrive(index, t));
    }
    future
}

/// Shared state of [`all_of_run`]: like [`AllOfContext`] but delivering to a
/// raw continuation instead of a promise.
struct AllOfRunContext<T: Send + 'static> {
    slots: Mutex<Vec<Option<Try<T>>>>,
    arrived: AtomicUsize,
    total: usize,
    func: Mutex<Option<Box<dyn FnOnce(Vec<Try<T>>) + Send + 'static>>>,
}

impl<T: Send + 'static> AllOfRunContext<T> {
    fn arrive(&self, index: usize, t: Try<T>) {
        self.slots.lock()[index] = Some(t);
        if self.arrived.fetch_add(1, SeqCst) + 1 == self.total {
            let mut slots = self.slots.lock();
            let collected: Vec<Try<T>> = slots
                .iter_mut()
                .map(|slot| match slot.take() {
                    Some(t) => t,
                    None => unreachable!(),
                })
                .collect();
            drop(slots);
            let func = self.func.lock().take();
            if let Some(func) = func {
                func(collected);
            }
        }
    }
}

/// Collects all futures like [`all_of`], but delivers the assembled vector
/// straight to `func` on the thread of the final arrival, without routing
/// through another promise. An empty input invokes `func` immediately.
pub fn all_of_run<T: Send + 'static>(
    futures: Vec<Future<T>>,
    func: impl FnOnce(Vec<Try<T>>) + Send + 'static,
) {
    let total = futures.len();
    if total == 0 {
        func(Vec::new());
        return;
    }
    let ctx = Arc::new(AllOfRunContext {
        slots: Mutex::new((0..total).map(|_| None).collect()),
        arrived: AtomicUsize::new(0),
        total,
        func: Mutex::new(Some(Box::new(func))),
    });
    for (index, fut) in futures.into_iter().enumerate() {
        let slot_ctx = Arc::clone(&ctx);
        let refused = fut.then_run(move |t| slot_ctx.arrive(index, t));
        if let Err(err) = refused {
            ctx.arrive(index, Try::from_error(err));
        }
    }
}

/// Generates one fixed-arity tuple collection context plus its public entry.
/// Slots are positional; the arrival counter alone picks the publisher.
macro_rules! fan_in_tuple {
    ($ctx:ident, $func:ident, $total:literal, $(($idx:tt, $arg:ident, $T:ident)),+) => {
        struct $ctx<$($T: Send + 'static),+> {
            slots: Mutex<($(Option<Try<$T>>,)+)>,
            arrived: AtomicUsize,
            promise: Promise<($(Try<$T>,)+)>,
        }

        impl<$($T: Send + 'static),+> $ctx<$($T),+> {
            fn arrived_one(&self) {
                if self.arrived.fetch_add(1, SeqCst) + 1 == $total {
                    let mut slots = self.slots.lock();
                    let collected = ($(
                        match slots.$idx.take() {
                            Some(t) => t,
                            //Every slot was written before the final arrival.
                            None => unreachable!(),
                        },
                    )+);
                    drop(slots);
                    let _ = self.promise.set_try(Try::Value(collected));
                }
            }
        }

        #[doc = concat!(
            "Collects ", stringify!($total),
            " differently typed futures into one future of a tuple of [`Try`]s, positionally."
        )]
        ///
        /// Individual failures stay inside their tuple position; the aggregate
        /// itself always completes.
        #[must_use]
        pub fn $func<$($T: Send + 'static),+>(
            $($arg: Future<$T>),+
        ) -> Future<($(Try<$T>,)+)> {
            let (promise, future) = pair();
            let ctx = Arc::new($ctx {
                slots: Mutex::new(Default::default()),
                arrived: AtomicUsize::new(0),
                promise,
            });
            $(
                {
                    let slot_ctx = Arc::clone(&ctx);
                    let refused = $arg.then_run(move |t| {
                        slot_ctx.slots.lock().$idx = Some(t);
                        slot_ctx.arrived_one();
                    });
                    if let Err(err) = refused {
                        ctx.slots.lock().$idx = Some(Try::from_error(err));
                        ctx.arrived_one();
                    }
                }
            )+
            future
        }
    };
}

fan_in_tuple!(Join2Context, join2, 2, (0, a, A), (1, b, B));
fan_in_tuple!(Join3Context, join3, 3, (0, a, A), (1, b, B), (2, c, C));
fan_in_tuple!(Join4Context, join4, 4, (0, a, A), (1, b, B), (2, c, C), (3, d, D));

/// A unit of work handed to an [`Executor`].
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Dispatcher a [`Future`] may install to take continuation invocation off the
/// publishing thread. The only contract: every added task eventually runs.
///
/// The executor must outlive every task handed to it; the tasks themselves are
/// self-contained and keep no reference to the core they came from.
pub trait Executor: Send + Sync {
    fn add(&self, task: Task);
}

/// Spawns one thread per task.
pub struct ThreadExecutor;

impl Executor for ThreadExecutor {
    fn add(&self, task: Task) {
        thread::spawn(task);
    }
}

/// Runs every task immediately on the thread that adds it.
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn add(&self, task: Task) {
        task();
    }
}

/// Queues tasks until someone drains them. Doubles as the deterministic test
/// double for the executor dispatch path and as a single-threaded drain loop.
#[derive(Default)]
pub struct QueueExecutor(Mutex<VecDeque<Task>>);

impl QueueExecutor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }

    /// Run the oldest queued task, if any.
    ///
    /// # Returns
    /// true if a task ran.
    pub fn run_one(&self) -> bool {
        let task = self.0.lock().pop_front();
        match task {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    /// Drain the queue, including tasks enqueued by the tasks themselves.
    ///
    /// # Returns
    /// how many tasks ran.
    pub fn run_all(&self) -> usize {
        let mut ran = 0;
        while self.run_one() {
            ran += 1;
        }
        ran
    }
}

impl Debug for QueueExecutor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueExecutor")
            .field("queued", &self.len())
            .finish()
    }
}

impl Executor for QueueExecutor {
    fn add(&self, task: Task) {
        self.0.lock().push_back(task);
    }
}
