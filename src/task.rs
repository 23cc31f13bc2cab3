//! Task and execution management
//!
//! This module provides the methods needed to spawn tasks and execute them
//! until completion. Settle uses a per-thread executor model which means that
//! each new OS thread has its own execution environment. This means that:
//!
//! 1. The thread upon which a task is spawned is the same thread that will
//!    execute it.
//! 2. Each thread needs to call one of [Executor::block_on], [Executor::run]
//!    or [TaskJoiner::join] to do any work.
//!
//! Every combinator in this crate attaches its continuations and timers as
//! tasks on the executor of the thread it was called from.
//!
//! # Example
//!
//! Here is a simple hello world using [Executor::block_on].
//!
//! ```
//! use settle::task::Executor;
//! Executor::block_on(async { println!("Hello, world!"); });
//! ```
//!
//! You can also use [Executor::block_on] to easily obtain the result of a
//! future:
//!
//! ```
//! use settle::task::Executor;
//! let x = Executor::block_on(async { 2 + 8 });
//! assert_eq!(x, 10);
//! ```
//!
//! Here is the same but spawning multiple top-level tasks.
//!
//! ```
//! use settle::task::Executor;
//! Executor::spawn(async { println!("Hello"); });
//! Executor::spawn(async { println!("World!"); });
//! Executor::run();
//! ```
//!
//! # Threading Model
//!
//! Since each thread has its own execution state, if you don't spawn any new
//! threads you can guarantee that only a single task will be executing at once.
//! This allows for `!Sync` futures to be executed:
//!
//! ```
//! use settle::task::Executor;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! let cell = Rc::new(RefCell::new(0));
//! {
//!     let cell = cell.clone();
//!     Executor::spawn(async move { *cell.borrow_mut() += 10 });
//! }
//! {
//!     let cell = cell.clone();
//!     Executor::spawn(async move { *cell.borrow_mut() += 10 });
//! }
//! Executor::run();
//! assert_eq!(*cell.borrow(), 20);
//! ```
//!
//! Wakers on the other hand are `Send + Sync`: a future may be woken from any
//! thread, in which case the owning executor is signalled and resumes the task
//! on its own thread.
use std::{
    cell::RefCell,
    collections::VecDeque,
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    task::{Context, Poll, Wake, Waker},
};

use log::trace;
use slab::Slab;

use crate::{
    lock,
    reactor::{Notifier, Reactor},
};

struct ReadyQueue {
    keys: Mutex<VecDeque<usize>>,
    notifier: Notifier,
}

impl ReadyQueue {
    fn push(&self, key: usize) {
        lock(&self.keys).push_back(key);
        self.notifier.notify();
    }

    fn pop(&self) -> Option<usize> {
        lock(&self.keys).pop_front()
    }
}

struct TaskId {
    key: usize,
    scheduled: AtomicBool,
    queue: Arc<ReadyQueue>,
}

impl Wake for TaskId {
    fn wake(self: Arc<TaskId>) {
        self.wake_by_ref();
    }

    fn wake_by_ref(self: &Arc<TaskId>) {
        if !self.scheduled.swap(true, Ordering::AcqRel) {
            self.queue.push(self.key);
        }
    }
}

struct Task {
    id: Arc<TaskId>,
    // Taken out while the task is being polled.
    future: Option<Pin<Box<dyn Future<Output = ()>>>>,
    background: bool,
    // Woken while an outer poll had the future taken out.
    rewake: bool,
}

/// The async executor.
///
/// A type that is responsible for pushing futures through to
/// completion. You can begin execution of a new task by calling the
/// [Executor::block_on] function.
pub struct Executor {
    tasks: Slab<Task>,
    ready: Arc<ReadyQueue>,
    // Tasks that keep `run` going; background tasks are not counted.
    foreground: usize,
}

thread_local! {
    static EXEC: RefCell<Executor> = RefCell::new(Executor::new());
}

struct JoinState<T> {
    value: Option<T>,
    finished: bool,
    waker: Option<Waker>,
}

/// A handle to a running task.
///
/// You can call [TaskJoiner::join] from a synchronous context to drive this
/// thread's executor until the task finishes and yield the future's value. If
/// you want to wait for execution to finish from an asynchronous context, use
/// `.await` on the joiner. If the joiner is dropped then execution of the
/// future continues to completion but the return value is lost, aka
/// detach-on-drop.
pub struct TaskJoiner<T> {
    state: Arc<Mutex<JoinState<T>>>,
}

impl<T> TaskJoiner<T> {
    /// Drive this thread's executor until the task has finished executing. The
    /// return value `T` is the value yielded by the task's future.
    ///
    /// *Note* This function should only be called from synchronous contexts,
    /// and only for tasks spawned on the calling thread. From an asynchronous
    /// context, use `.await` instead.
    pub fn join(self) -> T {
        let state = self.state.clone();

        Executor::run_until(move || lock(&state).finished);

        lock(&self.state)
            .value
            .take()
            .expect("joined a task that was not spawned on this thread")
    }

    /// Returns `true` once the task's future has completed.
    pub fn is_finished(&self) -> bool {
        lock(&self.state).finished
    }
}

impl<T> Future for TaskJoiner<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = lock(&self.state);

        match state.value.take() {
            Some(value) => Poll::Ready(value),
            None => {
                state.waker = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}

impl Executor {
    fn new() -> Self {
        let notifier = Notifier::new().expect("failed to create executor eventfd");

        Self {
            tasks: Slab::new(),
            ready: Arc::new(ReadyQueue {
                keys: Mutex::new(VecDeque::new()),
                notifier,
            }),
            foreground: 0,
        }
    }

    /// Spawn a new future and add it to this thread's run queue. If called from
    /// an already-running asynchronous task, the future will be queued for
    /// execution. If called from a synchronous context, the task will *not* be
    /// executed until this thread drives its executor.
    ///
    /// Tasks are started in the order they were spawned.
    ///
    /// A [TaskJoiner] is returned which can be used to wait for completion of
    /// the future `f` and obtain its return value.
    pub fn spawn<Fut, T>(f: Fut) -> TaskJoiner<T>
    where
        Fut: Future<Output = T> + 'static,
        T: 'static,
    {
        let state = Arc::new(Mutex::new(JoinState {
            value: None,
            finished: false,
            waker: None,
        }));
        let state2 = state.clone();

        let fut = async move {
            let value = f.await;
            let waker = {
                let mut state = lock(&state2);
                state.value = Some(value);
                state.finished = true;
                state.waker.take()
            };

            if let Some(waker) = waker {
                waker.wake();
            }
        };

        Self::insert(Box::pin(fut), false);

        TaskJoiner { state }
    }

    /// Spawn a task that does not, on its own, keep [Executor::run] going.
    ///
    /// Continuations waiting on a promise that may never settle run as
    /// background tasks: once only they remain, nothing can make progress
    /// and `run` returns.
    pub(crate) fn spawn_background<Fut>(f: Fut)
    where
        Fut: Future<Output = ()> + 'static,
    {
        Self::insert(Box::pin(f), true);
    }

    fn insert(future: Pin<Box<dyn Future<Output = ()>>>, background: bool) {
        EXEC.with(|exec| {
            let mut exec = exec.borrow_mut();
            if !background {
                exec.foreground += 1;
            }

            let queue = exec.ready.clone();
            let slot = exec.tasks.vacant_entry();
            let key = slot.key();

            slot.insert(Task {
                id: Arc::new(TaskId {
                    key,
                    scheduled: AtomicBool::new(true),
                    queue: queue.clone(),
                }),
                future: Some(future),
                background,
                rewake: false,
            });

            trace!("spawned task {key} (background: {background})");
            queue.push(key);
        });
    }

    /// A convenience function for waiting on a future from a synchronous
    /// context. This is the equivalent of calling:
    ///
    /// ```
    /// # use settle::task::Executor;
    /// # use std::future::Future;
    /// # fn x<Fut: Future<Output = ()> + 'static>(f: Fut) {
    /// let task = Executor::spawn(f);
    /// task.join();
    /// # }
    /// ```
    ///
    /// Returns as soon as `f` has completed; other tasks spawned on this
    /// thread keep their place in the run queue.
    pub fn block_on<Fut, T>(f: Fut) -> T
    where
        Fut: Future<Output = T> + 'static,
        T: 'static,
    {
        Self::spawn(f).join()
    }

    /// Run the executor for this thread.
    ///
    /// This function will schedule and run all tasks that have been previously
    /// spawned with [Executor::spawn]. *Note* each thread has its own set of
    /// tasks and execution environment. If you call this function, only tasks
    /// that have been spawned on *this* thread will be executed.
    ///
    /// Blocks until all tasks have finished executing. Background tasks, such
    /// as continuations attached to a promise that has not settled, are
    /// polled while they are ready but do not keep this function waiting.
    pub fn run() {
        Self::run_until(|| false)
    }

    fn run_until(done: impl Fn() -> bool) {
        let ready = EXEC.with(|exec| exec.borrow().ready.clone());

        loop {
            if done() {
                return;
            }

            match ready.pop() {
                Some(key) => Self::poll_task(key),
                None => {
                    if EXEC.with(|exec| exec.borrow().foreground == 0) {
                        return;
                    }

                    Reactor::react(&ready.notifier);
                }
            }
        }
    }

    fn poll_task(key: usize) {
        let task = EXEC.with(|exec| {
            exec.borrow_mut().tasks.get_mut(key).and_then(|task| {
                task.id.scheduled.store(false, Ordering::Release);

                match task.future.take() {
                    Some(future) => Some((task.id.clone(), future)),
                    None => {
                        // Being polled further up the stack by a nested
                        // `block_on`; poll again once that poll returns.
                        task.rewake = true;
                        None
                    }
                }
            })
        });

        // Stale wake-up for a task that already finished, or one that is
        // currently being polled.
        let Some((id, mut future)) = task else {
            return;
        };

        let waker = Waker::from(id);
        let mut cx = Context::from_waker(&waker);

        match future.as_mut().poll(&mut cx) {
            Poll::Ready(()) => {
                trace!("task {key} finished");
                // Dropped outside of the borrow, the future may own other
                // futures that touch the executor when dropped.
                let task = EXEC.with(|exec| {
                    let mut exec = exec.borrow_mut();
                    let task = exec.tasks.remove(key);
                    if !task.background {
                        exec.foreground -= 1;
                    }
                    task
                });
                drop(task);
                drop(future);
            }
            Poll::Pending => EXEC.with(|exec| {
                if let Some(task) = exec.borrow_mut().tasks.get_mut(key) {
                    task.future = Some(future);

                    if std::mem::take(&mut task.rewake) {
                        task.id.wake_by_ref();
                    }
                }
            }),
        }
    }
}
