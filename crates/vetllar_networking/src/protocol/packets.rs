//! # Packet Definitions
//!
//! All packet payloads are `Copy`, fixed-size and `Pod`, so they are written
//! and read as raw little-endian bytes without per-field code.

use bytemuck::{Pod, Zeroable};
use vetllar_core::{EntityId, TargetRef};
use vetllar_interaction::{
    InteractableState, Interactability, InteractionRequest, InteractionResult, InteractorState,
    ReplicationUpdate,
};

use super::error::ProtocolError;

/// Packet header - present in every packet.
///
/// Total size: 8 bytes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct PacketHeader {
    /// Sender's sequence number for this packet.
    pub sequence: u32,
    /// Sender's tick when the packet was written.
    pub tick: u32,
}

impl PacketHeader {
    /// Size of the header in bytes.
    pub const SIZE: usize = 8;

    /// Creates a new packet header.
    #[inline]
    #[must_use]
    pub const fn new(sequence: u32, tick: u32) -> Self {
        Self { sequence, tick }
    }
}

/// Types of packets in the protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketType {
    /// Client -> Server: connection request.
    Connect = 0,
    /// Server -> Client: connection accepted, names the owned interactor.
    ConnectAck = 1,
    /// Client -> Server: start or stop request.
    Request = 2,
    /// Server -> Client: interactor snapshot.
    InteractorState = 3,
    /// Server -> Client: interactable snapshot.
    InteractableState = 4,
    /// Bidirectional: disconnect notification.
    Disconnect = 5,
}

impl PacketType {
    /// Decodes the leading type byte.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::UnknownPacketType`] for unassigned values.
    pub const fn from_u8(value: u8) -> Result<Self, ProtocolError> {
        match value {
            0 => Ok(Self::Connect),
            1 => Ok(Self::ConnectAck),
            2 => Ok(Self::Request),
            3 => Ok(Self::InteractorState),
            4 => Ok(Self::InteractableState),
            5 => Ok(Self::Disconnect),
            other => Err(ProtocolError::UnknownPacketType(other)),
        }
    }
}

/// Optional (entity, sub-component) handle.
///
/// Size: 16 bytes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct WireTarget {
    /// Raw [`EntityId`] bits.
    pub entity: u64,
    /// Sub-component index.
    pub part: u32,
    /// 1 if a target is present.
    pub present: u8,
    /// Padding for alignment.
    pub _padding: [u8; 3],
}

impl WireTarget {
    /// No target.
    pub const NONE: Self = Self {
        entity: 0,
        part: 0,
        present: 0,
        _padding: [0; 3],
    };

    /// Encodes an optional target.
    #[must_use]
    pub const fn from_target(target: Option<TargetRef>) -> Self {
        match target {
            Some(target) => Self {
                entity: target.entity.to_bits(),
                part: target.part,
                present: 1,
                _padding: [0; 3],
            },
            None => Self::NONE,
        }
    }

    /// Decodes back into an optional target.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::InvalidEnum`] if the presence flag is not 0 or 1.
    pub fn to_target(self) -> Result<Option<TargetRef>, ProtocolError> {
        let present = decode_bool("target.present", self.present)?;
        Ok(present.then(|| TargetRef::new(EntityId::from_bits(self.entity), self.part)))
    }
}

/// Connection acceptance payload.
///
/// Size: 16 bytes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct ConnectAck {
    /// Server-assigned client id.
    pub client_id: u32,
    /// Padding for alignment.
    pub _padding: [u8; 4],
    /// Raw bits of the interactor this client controls.
    pub interactor: u64,
}

/// Client request payload.
///
/// Size: 32 bytes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct RequestPacket {
    /// Raw bits of the requesting interactor.
    pub interactor: u64,
    /// Client-picked target (cursor modes only).
    pub focused: WireTarget,
    /// [`RequestPacket::KIND_START`] or [`RequestPacket::KIND_STOP`].
    pub kind: u8,
    /// Padding for alignment.
    pub _padding: [u8; 7],
}

impl RequestPacket {
    /// Start interacting.
    pub const KIND_START: u8 = 0;
    /// Stop a hold interaction.
    pub const KIND_STOP: u8 = 1;

    /// Encodes a request.
    #[must_use]
    pub fn from_request(request: &InteractionRequest) -> Self {
        let (interactor, focused, kind) = match *request {
            InteractionRequest::Start { interactor, focused } => {
                (interactor, WireTarget::from_target(focused), Self::KIND_START)
            }
            InteractionRequest::Stop { interactor } => {
                (interactor, WireTarget::NONE, Self::KIND_STOP)
            }
        };
        Self {
            interactor: interactor.to_bits(),
            focused,
            kind,
            _padding: [0; 7],
        }
    }

    /// Decodes the request.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::InvalidEnum`] for an unknown kind or presence flag.
    pub fn to_request(&self) -> Result<InteractionRequest, ProtocolError> {
        let interactor = EntityId::from_bits(self.interactor);
        match self.kind {
            Self::KIND_START => Ok(InteractionRequest::Start {
                interactor,
                focused: self.focused.to_target()?,
            }),
            Self::KIND_STOP => Ok(InteractionRequest::Stop { interactor }),
            value => Err(ProtocolError::InvalidEnum {
                field: "request.kind",
                value,
            }),
        }
    }
}

/// Interactor snapshot payload.
///
/// Size: 40 bytes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct InteractorStatePacket {
    /// Raw bits of the interactor.
    pub entity: u64,
    /// Replication version.
    pub version: u64,
    /// Current focus.
    pub focused: WireTarget,
    /// 1 while a timed interaction runs.
    pub is_interacting: u8,
    /// [`InteractionResult`] discriminant.
    pub result: u8,
    /// Padding for alignment.
    pub _padding: [u8; 6],
}

impl InteractorStatePacket {
    /// Encodes a snapshot.
    #[must_use]
    pub fn encode(entity: EntityId, state: &InteractorState) -> Self {
        Self {
            entity: entity.to_bits(),
            version: state.version(),
            focused: WireTarget::from_target(state.focused_target()),
            is_interacting: u8::from(state.is_interacting()),
            result: state.result() as u8,
            _padding: [0; 6],
        }
    }

    /// Decodes into a replication update.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::InvalidEnum`] for out-of-range fields.
    pub fn decode(&self) -> Result<ReplicationUpdate, ProtocolError> {
        let state = InteractorState::from_parts(
            decode_bool("interactor.is_interacting", self.is_interacting)?,
            decode_result(self.result)?,
            self.focused.to_target()?,
            self.version,
        );
        Ok(ReplicationUpdate::Interactor {
            entity: EntityId::from_bits(self.entity),
            state,
        })
    }
}

/// Interactable snapshot payload.
///
/// Size: 40 bytes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct InteractableStatePacket {
    /// Raw bits of the state machine host.
    pub entity: u64,
    /// Replication version.
    pub version: u64,
    /// Part focused when the last interaction started.
    pub focused_part: WireTarget,
    /// [`Interactability`] discriminant.
    pub interactability: u8,
    /// [`InteractionResult`] discriminant.
    pub result: u8,
    /// 1 while an interaction is in progress.
    pub is_being_interacted_with: u8,
    /// Padding for alignment.
    pub _padding: [u8; 5],
}

impl InteractableStatePacket {
    /// Encodes a snapshot.
    #[must_use]
    pub fn encode(entity: EntityId, state: &InteractableState) -> Self {
        Self {
            entity: entity.to_bits(),
            version: state.version(),
            focused_part: WireTarget::from_target(state.focused_part()),
            interactability: state.interactability() as u8,
            result: state.result() as u8,
            is_being_interacted_with: u8::from(state.is_being_interacted_with()),
            _padding: [0; 5],
        }
    }

    /// Decodes into a replication update.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::InvalidEnum`] for out-of-range fields.
    pub fn decode(&self) -> Result<ReplicationUpdate, ProtocolError> {
        let interactability =
            Interactability::from_u8(self.interactability).ok_or(ProtocolError::InvalidEnum {
                field: "interactable.interactability",
                value: self.interactability,
            })?;
        let state = InteractableState::from_parts(
            interactability,
            decode_result(self.result)?,
            decode_bool(
                "interactable.is_being_interacted_with",
                self.is_being_interacted_with,
            )?,
            self.focused_part.to_target()?,
            self.version,
        );
        Ok(ReplicationUpdate::Interactable {
            entity: EntityId::from_bits(self.entity),
            state,
        })
    }
}

fn decode_bool(field: &'static str, value: u8) -> Result<bool, ProtocolError> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        value => Err(ProtocolError::InvalidEnum { field, value }),
    }
}

fn decode_result(value: u8) -> Result<InteractionResult, ProtocolError> {
    InteractionResult::from_u8(value).ok_or(ProtocolError::InvalidEnum {
        field: "result",
        value,
    })
}

/// A decoded packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Packet {
    /// Connection request.
    Connect(PacketHeader),
    /// Connection accepted.
    ConnectAck(PacketHeader, ConnectAck),
    /// Client request.
    Request(PacketHeader, RequestPacket),
    /// Interactor snapshot.
    Interactor(PacketHeader, InteractorStatePacket),
    /// Interactable snapshot.
    Interactable(PacketHeader, InteractableStatePacket),
    /// Disconnect notification.
    Disconnect(PacketHeader),
}

impl Packet {
    /// Wraps a replication update.
    #[must_use]
    pub fn replication(header: PacketHeader, update: &ReplicationUpdate) -> Self {
        match update {
            ReplicationUpdate::Interactor { entity, state } => {
                Self::Interactor(header, InteractorStatePacket::encode(*entity, state))
            }
            ReplicationUpdate::Interactable { entity, state } => {
                Self::Interactable(header, InteractableStatePacket::encode(*entity, state))
            }
        }
    }

    /// Wraps a client request.
    #[must_use]
    pub fn request(header: PacketHeader, request: &InteractionRequest) -> Self {
        Self::Request(header, RequestPacket::from_request(request))
    }

    /// Packet type tag.
    #[must_use]
    pub const fn packet_type(&self) -> PacketType {
        match self {
            Self::Connect(_) => PacketType::Connect,
            Self::ConnectAck(..) => PacketType::ConnectAck,
            Self::Request(..) => PacketType::Request,
            Self::Interactor(..) => PacketType::InteractorState,
            Self::Interactable(..) => PacketType::InteractableState,
            Self::Disconnect(_) => PacketType::Disconnect,
        }
    }

    /// Packet header.
    #[must_use]
    pub const fn header(&self) -> PacketHeader {
        match self {
            Self::Connect(header)
            | Self::ConnectAck(header, _)
            | Self::Request(header, _)
            | Self::Interactor(header, _)
            | Self::Interactable(header, _)
            | Self::Disconnect(header) => *header,
        }
    }
}
