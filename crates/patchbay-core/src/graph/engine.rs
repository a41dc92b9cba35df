//! The [`Graph`] handle: node registry, connection edits, the update protocol
//! and lifecycle calls.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, AtomicU64, AtomicUsize, Ordering};

use arc_swap::ArcSwap;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::component::ComponentDescription;
use crate::error::GraphError;
use crate::registry::ComponentRegistry;
use crate::render::{self, NotifyList, RefCon, RenderFailure, RenderNotify, Renderer};
use crate::settings::GraphSettings;

use super::connection::Connection;
use super::edit::{EditStatus, PendingEdit};
use super::lifecycle::{self, GraphState};
use super::node::{NodeEntry, NodeId, NodeInfo, NodeKind};
use super::topology::{self, CommittedView, Topology};

/// State shared by every handle to one graph and its renderer.
pub(crate) struct GraphShared {
    pub registry: Arc<ComponentRegistry>,
    pub settings: GraphSettings,
    pub topology: Mutex<Topology>,
    pending: Mutex<VecDeque<PendingEdit>>,
    state: AtomicU8,
    next_node: AtomicU32,
    /// Generation of the plan the renderer is using.
    pub active_generation: AtomicU64,
    pub renderer_attached: AtomicBool,
    /// Committed topology for queries, readable without the topology lock.
    committed: ArcSwap<CommittedView>,
    /// Mirrors `pending.len()` so the count can be read from a render callback.
    queued: AtomicUsize,
    /// Raw id of the output node as of the last applied edit, 0 for none.
    applied_output: AtomicU32,
    pub notify: NotifyList,
    pub failure_tx: Sender<RenderFailure>,
    failure_rx: Receiver<RenderFailure>,
    pub dropped_failures: AtomicUsize,
}

impl GraphShared {
    pub fn state(&self) -> GraphState {
        GraphState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: GraphState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

/// A processing graph.
///
/// `Graph` is a cheap, cloneable handle; clones refer to the same graph and may
/// be used from any control thread. Rendering goes through the single
/// [`Renderer`] returned by [`renderer`](Self::renderer).
///
/// Topology edits return [`EditStatus::Applied`] when they took effect
/// immediately, or [`EditStatus::Deferred`] when they were queued because the
/// graph is running (or earlier edits are still queued). Queued edits take
/// effect at the next successful [`update`](Self::update).
#[derive(Clone)]
pub struct Graph {
    shared: Arc<GraphShared>,
}

fn forbid_in_render(operation: &'static str) -> Result<(), GraphError> {
    if render::in_render_context() {
        Err(GraphError::CannotDoInCurrentContext(operation))
    } else {
        Ok(())
    }
}

impl Graph {
    /// Creates an empty, closed graph with default settings.
    pub fn new(registry: Arc<ComponentRegistry>) -> Self {
        Self::with_settings(registry, GraphSettings::default())
    }

    /// Creates an empty, closed graph.
    pub fn with_settings(registry: Arc<ComponentRegistry>, settings: GraphSettings) -> Self {
        let (failure_tx, failure_rx) =
            crossbeam_channel::bounded(settings.failure_queue_capacity.max(1));
        Self {
            shared: Arc::new(GraphShared {
                registry,
                settings,
                topology: Mutex::new(Topology::default()),
                pending: Mutex::new(VecDeque::new()),
                state: AtomicU8::new(GraphState::Closed as u8),
                next_node: AtomicU32::new(1),
                active_generation: AtomicU64::new(0),
                renderer_attached: AtomicBool::new(false),
                committed: ArcSwap::from_pointee(CommittedView::default()),
                queued: AtomicUsize::new(0),
                applied_output: AtomicU32::new(0),
                notify: NotifyList::default(),
                failure_tx,
                failure_rx,
                dropped_failures: AtomicUsize::new(0),
            }),
        }
    }

    /// Settings this graph was created with.
    pub fn settings(&self) -> GraphSettings {
        self.shared.settings
    }

    /// Registry used to instantiate processors.
    pub fn registry(&self) -> &Arc<ComponentRegistry> {
        &self.shared.registry
    }

    /// True if both handles refer to the same graph.
    pub fn ptr_eq(&self, other: &Graph) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    // --- Lifecycle ---

    /// Current lifecycle state.
    pub fn state(&self) -> GraphState {
        self.shared.state()
    }

    /// True once [`open`](Self::open) has succeeded (and until [`close`](Self::close)).
    pub fn is_open(&self) -> bool {
        self.state() >= GraphState::Open
    }

    /// True while initialized or running.
    pub fn is_initialized(&self) -> bool {
        self.state() >= GraphState::Initialized
    }

    /// True while running.
    pub fn is_running(&self) -> bool {
        self.state() == GraphState::Running
    }

    /// Instantiates and opens every node's processor.
    ///
    /// All or nothing: if any node fails, the nodes opened by this call are
    /// closed again and the graph stays closed. No-op unless closed.
    pub fn open(&self) -> Result<(), GraphError> {
        forbid_in_render("open a graph from a render callback")?;
        let mut topo = self.shared.topology.lock();
        if self.state() != GraphState::Closed {
            return Ok(());
        }
        lifecycle::open_all(&topo, &self.shared.registry)?;
        self.shared.set_state(GraphState::Open);
        info!(nodes = topo.nodes.len(), "graph opened");
        self.commit(&mut topo);
        Ok(())
    }

    /// Allocates render resources, sources before sinks, and publishes the
    /// first render plan.
    ///
    /// Rolls back on failure. Fails with [`GraphError::InvalidState`] when closed.
    pub fn initialize(&self) -> Result<(), GraphError> {
        forbid_in_render("initialize a graph from a render callback")?;
        let mut topo = self.shared.topology.lock();
        match self.state() {
            GraphState::Closed => Err(GraphError::InvalidState {
                operation: "initialize",
                state: GraphState::Closed,
            }),
            GraphState::Open => {
                lifecycle::initialize_all(&topo, &self.shared.settings.format())?;
                self.shared.set_state(GraphState::Initialized);
                info!(
                    sample_rate = self.shared.settings.sample_rate,
                    max_frames = self.shared.settings.max_frames,
                    "graph initialized"
                );
                self.commit(&mut topo);
                Ok(())
            }
            GraphState::Initialized | GraphState::Running => Ok(()),
        }
    }

    /// Starts rendering. Only the output node's processor is started.
    pub fn start(&self) -> Result<(), GraphError> {
        forbid_in_render("start a graph from a render callback")?;
        let mut topo = self.shared.topology.lock();
        match self.state() {
            state @ (GraphState::Closed | GraphState::Open) => Err(GraphError::InvalidState {
                operation: "start",
                state,
            }),
            GraphState::Initialized => {
                lifecycle::start_output(&topo)?;
                self.shared.set_state(GraphState::Running);
                info!(output = ?topo.output_node, "graph started");
                self.collect_garbage(&mut topo);
                Ok(())
            }
            GraphState::Running => Ok(()),
        }
    }

    /// Stops rendering. Only the output node's processor is stopped.
    pub fn stop(&self) -> Result<(), GraphError> {
        forbid_in_render("stop a graph from a render callback")?;
        let mut topo = self.shared.topology.lock();
        if self.state() == GraphState::Running {
            lifecycle::stop_output(&topo);
            self.shared.set_state(GraphState::Initialized);
            info!("graph stopped");
            self.collect_garbage(&mut topo);
        }
        Ok(())
    }

    /// Releases render resources. Fails with
    /// [`GraphError::CannotDoInCurrentContext`] while running.
    pub fn uninitialize(&self) -> Result<(), GraphError> {
        forbid_in_render("uninitialize a graph from a render callback")?;
        let mut topo = self.shared.topology.lock();
        match self.state() {
            GraphState::Running => Err(GraphError::CannotDoInCurrentContext(
                "uninitialize a running graph",
            )),
            GraphState::Initialized => {
                lifecycle::uninitialize_all(&topo);
                self.shared.set_state(GraphState::Open);
                info!("graph uninitialized");
                self.commit(&mut topo);
                self.collect_garbage(&mut topo);
                Ok(())
            }
            GraphState::Closed | GraphState::Open => Ok(()),
        }
    }

    /// Closes every node's processor, uninitializing first if needed. Fails
    /// with [`GraphError::CannotDoInCurrentContext`] while running.
    pub fn close(&self) -> Result<(), GraphError> {
        forbid_in_render("close a graph from a render callback")?;
        let mut topo = self.shared.topology.lock();
        match self.state() {
            GraphState::Running => Err(GraphError::CannotDoInCurrentContext(
                "close a running graph",
            )),
            GraphState::Closed => Ok(()),
            state @ (GraphState::Open | GraphState::Initialized) => {
                if state == GraphState::Initialized {
                    lifecycle::uninitialize_all(&topo);
                }
                lifecycle::close_all(&topo);
                self.shared.set_state(GraphState::Closed);
                info!("graph closed");
                self.commit(&mut topo);
                self.collect_garbage(&mut topo);
                Ok(())
            }
        }
    }

    /// Closes the graph and releases every node, connection, pending edit and
    /// notification. Fails with [`GraphError::CannotDoInCurrentContext`] while
    /// running. Other handles remain valid and see an empty, closed graph.
    pub fn dispose(self) -> Result<(), GraphError> {
        forbid_in_render("dispose a graph from a render callback")?;
        if self.is_running() {
            return Err(GraphError::CannotDoInCurrentContext(
                "dispose a running graph",
            ));
        }
        self.close()?;
        {
            let mut topo = self.shared.topology.lock();
            let nodes = std::mem::take(&mut topo.nodes);
            for entry in nodes.values() {
                lifecycle::teardown(entry);
            }
            topo.connections.clear();
            topo.output_node = None;
            topo.next_plan = None;
            topo.retired = None;
            for (_, entry) in topo.graveyard.drain(..) {
                lifecycle::teardown(&entry);
            }
            self.shared.applied_output.store(0, Ordering::Release);
            self.shared.committed.store(Arc::new(CommittedView::default()));
            info!(released = nodes.len(), "graph disposed");
        }
        {
            let mut pending = self.shared.pending.lock();
            pending.clear();
            self.shared.queued.store(0, Ordering::Release);
        }
        self.shared.notify.remove(None, 0);
        Ok(())
    }

    // --- Node registry ---

    fn allocate_id(&self) -> NodeId {
        NodeId(self.shared.next_node.fetch_add(1, Ordering::AcqRel))
    }

    /// Adds a node for `description` configured by `config`.
    ///
    /// Returns the new id. In an open or initialized graph the node's processor
    /// is brought to that state before the node becomes visible. While the
    /// graph is running the node is added at the next [`update`](Self::update).
    ///
    /// Fails with [`GraphError::InvalidDescriptor`] for malformed descriptions
    /// and [`GraphError::OutputNodeConflict`] when adding a second output node.
    pub fn add_node(
        &self,
        description: ComponentDescription,
        config: &[u8],
    ) -> Result<NodeId, GraphError> {
        if !description.is_well_formed() || description.is_sub_graph() {
            return Err(GraphError::InvalidDescriptor(description));
        }
        let id = self.allocate_id();
        let _status = self.submit(PendingEdit::AddNode {
            id,
            description,
            config: Arc::from(config),
        })?;
        Ok(id)
    }

    /// Adds a node whose payload is a new, empty nested graph sharing this
    /// graph's registry and settings.
    ///
    /// The parent owns the nested graph: it is opened, initialized and started
    /// along with its node, and stopped and closed when the node is removed or
    /// the parent closes. The returned handle is for editing it.
    pub fn add_subgraph_node(&self) -> Result<(NodeId, Graph), GraphError> {
        let nested = Graph::with_settings(Arc::clone(&self.shared.registry), self.shared.settings);
        let id = self.allocate_id();
        let _status = self.submit(PendingEdit::AddSubGraph {
            id,
            graph: nested.clone(),
        })?;
        Ok((id, nested))
    }

    /// Removes a node and all of its connections.
    ///
    /// From inside a render callback, removing the output node or a sub-graph
    /// node fails with [`GraphError::CannotDoInCurrentContext`].
    pub fn remove_node(&self, id: NodeId) -> Result<EditStatus, GraphError> {
        if render::in_render_context() && self.shared.committed.load().protected.contains(&id) {
            return Err(GraphError::CannotDoInCurrentContext(
                "remove the output or a sub-graph node from a render callback",
            ));
        }
        self.submit(PendingEdit::RemoveNode(id))
    }

    /// Snapshot of one node.
    pub fn node_info(&self, id: NodeId) -> Result<NodeInfo, GraphError> {
        let topo = self.lock_topology("query a node from a render callback")?;
        Ok(topo.node(id)?.info())
    }

    /// The nested graph of a sub-graph node, `None` for component nodes.
    pub fn subgraph(&self, id: NodeId) -> Result<Option<Graph>, GraphError> {
        let topo = self.lock_topology("query a node from a render callback")?;
        Ok(topo.node(id)?.sub_graph().cloned())
    }

    /// Number of committed nodes.
    ///
    /// This and the other counting queries read the last committed snapshot
    /// and never wait for the topology lock, so they are safe from a render
    /// callback.
    pub fn node_count(&self) -> usize {
        self.shared.committed.load().nodes.len()
    }

    /// Committed node ids in ascending order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.shared.committed.load().nodes.clone()
    }

    /// The output node, if one is committed.
    pub fn output_node(&self) -> Option<NodeId> {
        self.shared.committed.load().output_node
    }

    // --- Connection table ---

    /// Connects `source:source_output` to `dest:dest_input`.
    ///
    /// Fails with [`GraphError::NodeNotFound`] for an absent endpoint and
    /// [`GraphError::InvalidConnection`] when the input is occupied, a port
    /// index is out of range, or the edge would close a cycle feeding the
    /// output node.
    pub fn connect(
        &self,
        source: NodeId,
        source_output: u32,
        dest: NodeId,
        dest_input: u32,
    ) -> Result<EditStatus, GraphError> {
        let connection = Connection::new(source, source_output, dest, dest_input);
        topology::check_ports(&connection)?;
        self.submit(PendingEdit::Connect(connection))
    }

    /// Removes the connection feeding `dest:dest_input`.
    pub fn disconnect(&self, dest: NodeId, dest_input: u32) -> Result<EditStatus, GraphError> {
        self.submit(PendingEdit::Disconnect { dest, dest_input })
    }

    /// Removes every connection.
    pub fn clear_connections(&self) -> Result<EditStatus, GraphError> {
        self.submit(PendingEdit::ClearConnections)
    }

    /// The committed connection at `index`, in insertion order.
    pub fn connection_info(&self, index: usize) -> Result<Connection, GraphError> {
        let topo = self.lock_topology("query a connection from a render callback")?;
        topo.connections
            .get(index)
            .copied()
            .ok_or(GraphError::ConnectionIndexOutOfRange {
                index,
                count: topo.connections.len(),
            })
    }

    /// Number of committed connections.
    pub fn connection_count(&self) -> usize {
        self.shared.committed.load().connections.len()
    }

    /// Every committed connection in insertion order.
    pub fn connections(&self) -> Vec<Connection> {
        self.shared.committed.load().connections.clone()
    }

    /// Nodes the renderer visits, sources first, ending at the output node.
    ///
    /// Only nodes with a path to the output node are rendered.
    pub fn render_order(&self) -> Vec<NodeId> {
        self.shared.committed.load().render_order.clone()
    }

    // --- Pending edits ---

    /// Applies queued edits in FIFO order.
    ///
    /// With `blocking` the call waits for the topology lock. Without it the
    /// call returns `Ok(false)` immediately if the lock is busy, leaving the
    /// topology untouched; retry on a later cycle.
    ///
    /// If an edit fails, the edits before it stay applied, the failing edit
    /// stays at the head of the queue, and its error is returned. Use
    /// [`discard_pending_edit`](Self::discard_pending_edit) to drop it.
    pub fn update(&self, blocking: bool) -> Result<bool, GraphError> {
        if render::in_render_context() {
            if blocking {
                return Err(GraphError::CannotDoInCurrentContext(
                    "block on update from a render callback",
                ));
            }
            return Ok(false);
        }
        let mut topo = if blocking {
            self.shared.topology.lock()
        } else {
            match self.shared.topology.try_lock() {
                Some(topo) => topo,
                None => {
                    debug!("topology busy, update skipped");
                    return Ok(false);
                }
            }
        };
        let result = self.drain_pending(&mut topo);
        self.collect_garbage(&mut topo);
        result.map(|()| true)
    }

    /// Number of queued edits.
    pub fn pending_edit_count(&self) -> usize {
        self.shared.queued.load(Ordering::Acquire)
    }

    /// Snapshot of the queue, head first.
    ///
    /// From a render callback this fails with
    /// [`GraphError::CannotDoInCurrentContext`] if the queue is busy.
    pub fn pending_edits(&self) -> Result<Vec<PendingEdit>, GraphError> {
        let pending = if render::in_render_context() {
            self.shared
                .pending
                .try_lock()
                .ok_or(GraphError::CannotDoInCurrentContext(
                    "read the pending edits from a render callback",
                ))?
        } else {
            self.shared.pending.lock()
        };
        Ok(pending.iter().cloned().collect())
    }

    /// Drops the edit at the head of the queue.
    pub fn discard_pending_edit(&self) -> Result<Option<PendingEdit>, GraphError> {
        forbid_in_render("discard a pending edit from a render callback")?;
        let _topo = self.shared.topology.lock();
        let edit = {
            let mut pending = self.shared.pending.lock();
            let edit = pending.pop_front();
            self.shared.queued.store(pending.len(), Ordering::Release);
            edit
        };
        if let Some(edit) = &edit {
            debug!(edit = edit.kind(), "pending edit discarded");
        }
        Ok(edit)
    }

    fn submit(&self, edit: PendingEdit) -> Result<EditStatus, GraphError> {
        if render::in_render_context() || self.is_running() {
            let mut pending = self.shared.pending.lock();
            return self.defer(&mut pending, edit);
        }

        let mut topo = self.shared.topology.lock();
        {
            let mut pending = self.shared.pending.lock();
            if self.is_running() || !pending.is_empty() {
                return self.defer(&mut pending, edit);
            }
        }
        self.apply_edit(&mut topo, &edit)?;
        self.publish_output(&topo);
        debug!(edit = edit.kind(), "edit applied");
        self.commit(&mut topo);
        self.collect_garbage(&mut topo);
        Ok(EditStatus::Applied)
    }

    /// Queues `edit` after checking what can be checked without the topology.
    fn defer(
        &self,
        pending: &mut VecDeque<PendingEdit>,
        edit: PendingEdit,
    ) -> Result<EditStatus, GraphError> {
        self.check_known(&edit)?;
        if matches!(&edit, PendingEdit::AddNode { description, .. } if description.is_output()) {
            self.check_queued_output(pending)?;
        }
        debug!(edit = edit.kind(), queued = pending.len() + 1, "edit deferred");
        pending.push_back(edit);
        self.shared.queued.store(pending.len(), Ordering::Release);
        Ok(EditStatus::Deferred)
    }

    /// Fails if the graph will already have an output node once `pending`
    /// has been applied.
    fn check_queued_output(&self, pending: &VecDeque<PendingEdit>) -> Result<(), GraphError> {
        let applied = self.shared.applied_output.load(Ordering::Acquire);
        let mut output = (applied != 0).then_some(NodeId(applied));
        for edit in pending {
            match edit {
                PendingEdit::AddNode { id, description, .. } if description.is_output() => {
                    output = Some(*id);
                }
                PendingEdit::RemoveNode(id) if output == Some(*id) => output = None,
                _ => {}
            }
        }
        match output {
            Some(existing) => Err(GraphError::OutputNodeConflict(existing)),
            None => Ok(()),
        }
    }

    /// Records the output node after an edit was applied. Must run before the
    /// edit leaves the queue so [`check_queued_output`](Self::check_queued_output)
    /// always sees it in one place or the other.
    fn publish_output(&self, topo: &Topology) {
        let raw = topo.output_node.map_or(0, NodeId::index);
        self.shared.applied_output.store(raw, Ordering::Release);
    }

    /// Rejects ids that were never allocated.
    fn check_known(&self, edit: &PendingEdit) -> Result<(), GraphError> {
        let next = self.shared.next_node.load(Ordering::Acquire);
        match edit.referenced_nodes().find(|id| id.0 == 0 || id.0 >= next) {
            Some(id) => Err(GraphError::NodeNotFound(id)),
            None => Ok(()),
        }
    }

    fn drain_pending(&self, topo: &mut Topology) -> Result<(), GraphError> {
        let mut applied = 0usize;
        let result = loop {
            let Some(edit) = self.shared.pending.lock().front().cloned() else {
                break Ok(());
            };
            if let Err(err) = self.apply_edit(topo, &edit) {
                warn!(
                    edit = edit.kind(),
                    error = %err,
                    remaining = self.pending_edit_count(),
                    "pending edit failed, queue halted"
                );
                break Err(err);
            }
            self.publish_output(topo);
            {
                let mut pending = self.shared.pending.lock();
                pending.pop_front();
                self.shared.queued.store(pending.len(), Ordering::Release);
            }
            applied += 1;
        };
        if applied > 0 {
            debug!(applied, "pending edits applied");
            self.commit(topo);
        }
        result
    }

    fn apply_edit(&self, topo: &mut Topology, edit: &PendingEdit) -> Result<(), GraphError> {
        match edit {
            PendingEdit::AddNode {
                id,
                description,
                config,
            } => self.insert_node(
                topo,
                NodeEntry::new(*id, *description, Arc::clone(config), NodeKind::Component),
            ),
            PendingEdit::AddSubGraph { id, graph } => self.insert_node(
                topo,
                NodeEntry::new(
                    *id,
                    ComponentDescription::SUB_GRAPH,
                    Arc::from(&[][..]),
                    NodeKind::SubGraph(graph.clone()),
                ),
            ),
            PendingEdit::RemoveNode(id) => {
                let entry = topo.take_node(*id)?;
                let retire_after = topo.generation + 1;
                topo.graveyard.push((retire_after, entry));
                Ok(())
            }
            PendingEdit::Connect(connection) => topo.connect(*connection),
            PendingEdit::Disconnect { dest, dest_input } => {
                topo.disconnect(*dest, *dest_input).map(|_| ())
            }
            PendingEdit::ClearConnections => {
                topo.connections.clear();
                Ok(())
            }
        }
    }

    fn insert_node(&self, topo: &mut Topology, entry: NodeEntry) -> Result<(), GraphError> {
        topo.check_output_slot(entry.description.is_output())?;
        lifecycle::bring_up(
            &entry,
            self.state(),
            &self.shared.registry,
            &self.shared.settings.format(),
        )?;
        topo.insert(entry);
        Ok(())
    }

    /// Publishes the committed topology: new generation, query snapshot, and
    /// a fresh render plan when initialized.
    fn commit(&self, topo: &mut Topology) {
        topo.generation += 1;
        self.shared.committed.store(Arc::new(topo.snapshot()));
        let plan = (self.state() >= GraphState::Initialized)
            .then(|| Box::new(topo.compile_plan(self.shared.settings.max_frames)));
        topo.next_plan = plan;
        debug!(
            generation = topo.generation,
            nodes = topo.nodes.len(),
            connections = topo.connections.len(),
            "topology committed"
        );
    }

    /// Drops the plan the renderer handed back and tears down removed nodes
    /// the renderer can no longer reach.
    fn collect_garbage(&self, topo: &mut Topology) {
        topo.retired = None;
        if topo.graveyard.is_empty() {
            return;
        }
        let renderer_live =
            self.is_running() && self.shared.renderer_attached.load(Ordering::Acquire);
        let active = self.shared.active_generation.load(Ordering::Acquire);
        let graveyard = std::mem::take(&mut topo.graveyard);
        for (retire_after, entry) in graveyard {
            if renderer_live && active < retire_after {
                topo.graveyard.push((retire_after, entry));
            } else {
                lifecycle::teardown(&entry);
                debug!(node = %entry.id, "removed node released");
            }
        }
    }

    fn lock_topology(&self, operation: &'static str) -> Result<MutexGuard<'_, Topology>, GraphError> {
        if render::in_render_context() {
            return self
                .shared
                .topology
                .try_lock()
                .ok_or(GraphError::CannotDoInCurrentContext(operation));
        }
        Ok(self.shared.topology.lock())
    }

    // --- Rendering ---

    /// Attaches the graph's single renderer.
    ///
    /// Fails with [`GraphError::CannotDoInCurrentContext`] while another
    /// renderer is attached.
    pub fn renderer(&self) -> Result<Renderer, GraphError> {
        forbid_in_render("attach a renderer from a render callback")?;
        if self
            .shared
            .renderer_attached
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(GraphError::CannotDoInCurrentContext(
                "attach a second renderer",
            ));
        }
        let mut topo = self.shared.topology.lock();
        topo.retired = None;
        let plan = self
            .is_initialized()
            .then(|| Box::new(topo.compile_plan(self.shared.settings.max_frames)));
        topo.next_plan = plan;
        self.shared.active_generation.store(0, Ordering::Release);
        debug!("renderer attached");
        Ok(Renderer::new(Arc::clone(&self.shared)))
    }

    /// Registers a callback invoked before and after every rendered cycle.
    ///
    /// Returns false if the same (callback, refcon) pair is already registered.
    pub fn add_render_notify(&self, callback: Arc<dyn RenderNotify>, refcon: RefCon) -> bool {
        self.shared.notify.add(callback, refcon)
    }

    /// Removes the (callback, refcon) registration, or every registration when
    /// `callback` is `None`. Returns how many were removed.
    pub fn remove_render_notify(
        &self,
        callback: Option<&Arc<dyn RenderNotify>>,
        refcon: RefCon,
    ) -> usize {
        self.shared.notify.remove(callback, refcon)
    }

    /// Number of registered render notifications.
    pub fn render_notify_count(&self) -> usize {
        self.shared.notify.len()
    }

    /// Receiver for failures reported by the render thread.
    pub fn render_failures(&self) -> Receiver<RenderFailure> {
        self.shared.failure_rx.clone()
    }

    /// Failures dropped because the failure channel was full.
    pub fn dropped_failures(&self) -> usize {
        self.shared.dropped_failures.load(Ordering::Relaxed)
    }
}

impl core::fmt::Debug for Graph {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Graph")
            .field("state", &self.state())
            .field("pending_edits", &self.pending_edit_count())
            .finish_non_exhaustive()
    }
}
