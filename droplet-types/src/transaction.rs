// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! BCS layout of a programmable transaction, restricted to what the
//! droplet client needs for `devInspect` reads: pure inputs, shared
//! objects and Move calls. Variant order is significant.

use crate::base_types::ObjectAddress;
use crate::type_tag::TypeTag;
use serde::{Deserialize, Serialize};

pub type SequenceNumber = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    ProgrammableTransaction(ProgrammableTransaction),
}

impl TransactionKind {
    pub fn to_bcs_bytes(&self) -> Result<Vec<u8>, bcs::Error> {
        bcs::to_bytes(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgrammableTransaction {
    pub inputs: Vec<CallArg>,
    pub commands: Vec<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallArg {
    Pure(Vec<u8>),
    Object(ObjectArg),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectArg {
    ImmOrOwnedObject((ObjectAddress, SequenceNumber, Vec<u8>)),
    SharedObject {
        id: ObjectAddress,
        initial_shared_version: SequenceNumber,
        mutable: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    MoveCall(Box<ProgrammableMoveCall>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgrammableMoveCall {
    pub package: ObjectAddress,
    pub module: String,
    pub function: String,
    pub type_arguments: Vec<TypeTag>,
    pub arguments: Vec<Argument>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Argument {
    GasCoin,
    Input(u16),
    Result(u16),
    NestedResult(u16, u16),
}

// =============================================================================
// Builder
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuilderError {
    #[error("failed to encode pure argument: {0}")]
    Encode(String),
    #[error("too many {0} in one transaction")]
    Overflow(&'static str),
}

/// Accumulates inputs and commands for a single programmable transaction.
#[derive(Debug, Default)]
pub struct ProgrammableTransactionBuilder {
    inputs: Vec<CallArg>,
    commands: Vec<Command>,
}

impl ProgrammableTransactionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn input(&mut self, arg: CallArg) -> Result<Argument, BuilderError> {
        let idx = u16::try_from(self.inputs.len()).map_err(|_| BuilderError::Overflow("inputs"))?;
        self.inputs.push(arg);
        Ok(Argument::Input(idx))
    }

    pub fn pure<T: Serialize>(&mut self, value: &T) -> Result<Argument, BuilderError> {
        let bytes = bcs::to_bytes(value).map_err(|e| BuilderError::Encode(e.to_string()))?;
        self.input(CallArg::Pure(bytes))
    }

    /// Pure input whose value is already BCS-encoded
    pub fn pure_bytes(&mut self, bytes: Vec<u8>) -> Result<Argument, BuilderError> {
        self.input(CallArg::Pure(bytes))
    }

    pub fn shared_object(
        &mut self,
        id: ObjectAddress,
        initial_shared_version: SequenceNumber,
        mutable: bool,
    ) -> Result<Argument, BuilderError> {
        self.input(CallArg::Object(ObjectArg::SharedObject {
            id,
            initial_shared_version,
            mutable,
        }))
    }

    pub fn move_call(
        &mut self,
        package: ObjectAddress,
        module: impl Into<String>,
        function: impl Into<String>,
        type_arguments: Vec<TypeTag>,
        arguments: Vec<Argument>,
    ) -> Result<Argument, BuilderError> {
        let idx =
            u16::try_from(self.commands.len()).map_err(|_| BuilderError::Overflow("commands"))?;
        self.commands
            .push(Command::MoveCall(Box::new(ProgrammableMoveCall {
                package,
                module: module.into(),
                function: function.into(),
                type_arguments,
                arguments,
            })));
        Ok(Argument::Result(idx))
    }

    pub fn finish(self) -> ProgrammableTransaction {
        ProgrammableTransaction {
            inputs: self.inputs,
            commands: self.commands,
        }
    }
}
