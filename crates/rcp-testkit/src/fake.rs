use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use rcp_api::{
    ApiError, ClientError, ConfirmedOrder, Contract, CreatedOrder, Device, FirewallPolicy, Order,
    ProductDetails, RackcorpApi, Transaction, TransactionFilter, TransactionObjectType,
    TransactionPage, TransactionType,
};

/// Provider commands the fake can be scripted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    DeviceGet,
    DeviceUpdateFirewall,
    OrderGet,
    OrderCreate,
    OrderConfirm,
    OrderContractGet,
    TransactionCreate,
    TransactionGet,
    TransactionGetAll,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::DeviceGet => "device.get",
            Command::DeviceUpdateFirewall => "device.update.firewall",
            Command::OrderGet => "order.get",
            Command::OrderCreate => "order.create",
            Command::OrderConfirm => "order.confirm",
            Command::OrderContractGet => "order.contract.get",
            Command::TransactionCreate => "rctransaction.create",
            Command::TransactionGet => "rctransaction.get",
            Command::TransactionGetAll => "rctransaction.getall",
        }
    }
}

/// One scripted provider answer.
#[derive(Debug, Clone)]
pub enum Reply {
    Order(Order),
    Created(CreatedOrder),
    Confirmed(ConfirmedOrder),
    Contract(Contract),
    Device(Device),
    Transaction(Transaction),
    Page(TransactionPage),
    /// Envelope-only success (firewall update).
    Ok,
    /// Non-OK envelope.
    Fail { code: String, message: String },
}

/// A recorded call: the command and its identifying argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub command: Command,
    pub target: String,
}

#[derive(Default)]
struct Inner {
    scripts: HashMap<Command, VecDeque<Reply>>,
    calls: Vec<Call>,
    product_codes: Vec<String>,
    firewall_submissions: Vec<Vec<FirewallPolicy>>,
    transactions_created: Vec<(TransactionType, String, bool)>,
}

/// Scripted in-memory provider used ONLY for tests.
///
/// Each command has its own reply queue. Replies are consumed in order and
/// the last one repeats, so a poll can be scripted as
/// `PENDING, PENDING, ACTIVE` and then keeps seeing `ACTIVE`. A command with
/// no script answers with a `FAULT` envelope.
#[derive(Default)]
pub struct FakeRackcorp {
    inner: Mutex<Inner>,
}

impl FakeRackcorp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, command: Command, reply: Reply) -> &Self {
        self.with(|i| i.scripts.entry(command).or_default().push_back(reply));
        self
    }

    pub fn replies(&self, command: Command, replies: impl IntoIterator<Item = Reply>) -> &Self {
        for r in replies {
            self.reply(command, r);
        }
        self
    }

    pub fn fail(&self, command: Command, code: &str, message: &str) -> &Self {
        self.reply(
            command,
            Reply::Fail {
                code: code.to_string(),
                message: message.to_string(),
            },
        )
    }

    pub fn calls(&self) -> Vec<Call> {
        self.with(|i| i.calls.clone())
    }

    pub fn commands(&self) -> Vec<Command> {
        self.with(|i| i.calls.iter().map(|c| c.command).collect())
    }

    pub fn count(&self, command: Command) -> usize {
        self.with(|i| i.calls.iter().filter(|c| c.command == command).count())
    }

    pub fn product_codes(&self) -> Vec<String> {
        self.with(|i| i.product_codes.clone())
    }

    pub fn firewall_submissions(&self) -> Vec<Vec<FirewallPolicy>> {
        self.with(|i| i.firewall_submissions.clone())
    }

    /// `(type, object id, confirm)` per `rctransaction.create`.
    pub fn transactions_created(&self) -> Vec<(TransactionType, String, bool)> {
        self.with(|i| i.transactions_created.clone())
    }

    fn with<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        let mut guard = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        f(&mut guard)
    }

    /// Record the call and pop its scripted reply.
    fn next(&self, command: Command, target: &str) -> Result<Reply, ClientError> {
        if target.trim().is_empty() {
            return Err(ClientError::Validation(format!(
                "{} target parameter is required",
                command.as_str()
            )));
        }

        let reply = self.with(|i| {
            i.calls.push(Call {
                command,
                target: target.to_string(),
            });
            let queue = i.scripts.entry(command).or_default();
            if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            }
        });

        match reply {
            None => Err(ClientError::api(
                command.as_str(),
                ApiError::new("FAULT", format!("no scripted reply for {}", command.as_str())),
            )),
            Some(Reply::Fail { code, message }) => Err(ClientError::api(
                command.as_str(),
                ApiError::new(code, message),
            )),
            Some(r) => Ok(r),
        }
    }
}

fn mismatch(command: Command, reply: Reply) -> ClientError {
    ClientError::Codec {
        command: command.as_str(),
        detail: format!("scripted reply {reply:?} does not fit"),
    }
}

impl RackcorpApi for FakeRackcorp {
    fn device_get(&self, device_id: &str) -> Result<Device, ClientError> {
        match self.next(Command::DeviceGet, device_id)? {
            Reply::Device(d) => Ok(d),
            other => Err(mismatch(Command::DeviceGet, other)),
        }
    }

    fn device_update_firewall(
        &self,
        device_id: &str,
        policies: &[FirewallPolicy],
    ) -> Result<(), ClientError> {
        self.with(|i| i.firewall_submissions.push(policies.to_vec()));
        match self.next(Command::DeviceUpdateFirewall, device_id)? {
            Reply::Ok => Ok(()),
            other => Err(mismatch(Command::DeviceUpdateFirewall, other)),
        }
    }

    fn order_get(&self, order_id: &str) -> Result<Order, ClientError> {
        match self.next(Command::OrderGet, order_id)? {
            Reply::Order(o) => Ok(o),
            other => Err(mismatch(Command::OrderGet, other)),
        }
    }

    fn order_create(
        &self,
        product_code: &str,
        customer_id: &str,
        _product_details: &ProductDetails,
    ) -> Result<CreatedOrder, ClientError> {
        if product_code.is_empty() {
            return Err(ClientError::Validation("productCode parameter is required".to_string()));
        }
        self.with(|i| i.product_codes.push(product_code.to_string()));
        match self.next(Command::OrderCreate, customer_id)? {
            Reply::Created(c) => Ok(c),
            other => Err(mismatch(Command::OrderCreate, other)),
        }
    }

    fn order_confirm(&self, order_id: &str) -> Result<ConfirmedOrder, ClientError> {
        match self.next(Command::OrderConfirm, order_id)? {
            Reply::Confirmed(c) => Ok(c),
            other => Err(mismatch(Command::OrderConfirm, other)),
        }
    }

    fn order_contract_get(&self, contract_id: &str) -> Result<Contract, ClientError> {
        match self.next(Command::OrderContractGet, contract_id)? {
            Reply::Contract(c) => Ok(c),
            other => Err(mismatch(Command::OrderContractGet, other)),
        }
    }

    fn transaction_create(
        &self,
        transaction_type: &TransactionType,
        object_type: &TransactionObjectType,
        object_id: &str,
        confirm: bool,
    ) -> Result<Transaction, ClientError> {
        if transaction_type.as_str().is_empty() || object_type.as_str().is_empty() {
            return Err(ClientError::Validation(
                "transaction type and object type are required".to_string(),
            ));
        }
        self.with(|i| {
            i.transactions_created
                .push((transaction_type.clone(), object_id.to_string(), confirm))
        });
        match self.next(Command::TransactionCreate, object_id)? {
            Reply::Transaction(t) => Ok(t),
            other => Err(mismatch(Command::TransactionCreate, other)),
        }
    }

    fn transaction_get(&self, transaction_id: &str) -> Result<Transaction, ClientError> {
        match self.next(Command::TransactionGet, transaction_id)? {
            Reply::Transaction(t) => Ok(t),
            other => Err(mismatch(Command::TransactionGet, other)),
        }
    }

    fn transaction_get_all(
        &self,
        filter: &TransactionFilter,
    ) -> Result<TransactionPage, ClientError> {
        let target = filter.object_ids.join(",");
        match self.next(Command::TransactionGetAll, &target)? {
            Reply::Page(p) => Ok(p),
            other => Err(mismatch(Command::TransactionGetAll, other)),
        }
    }
}
